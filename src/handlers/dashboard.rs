use axum::{extract::{Query, State}, Extension, Json};
use chrono::{Datelike, Utc};
use sqlx::PgPool;
use std::collections::HashMap;

use crate::dtos::dashboard::{
    DashboardData, HistoryData, HistoryQuery, MonthQuery, MonthlyStat, Overview,
    UnpaidCommissionGroup, UnpaidCommissionsBlock, UnpaidCommissionsData, UnpaidProduct, YearQuery,
};
use crate::dtos::sale::{SaleResponse, SupplierSummary};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::expense::Expense;
use crate::models::sale::{SaleWithSupplierRow, UnpaidSaleRow};
use crate::response::ApiResponse;
use crate::state::AppState;

use super::sale::SALE_SELECT;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// Complete dashboard in one call: monthly overview plus the unpaid
/// commission breakdown.
pub async fn index(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<ApiResponse<DashboardData>>, AppError> {
    let (month, year) = month_year_or_now(query.month, query.year);

    let overview = overview_for(&db_pool, auth.user_id, month, year).await?;
    let rows = unpaid_rows(&db_pool, auth.user_id).await?;
    let list = group_unpaid_commissions(rows);

    let unpaid_commissions = UnpaidCommissionsBlock {
        has_unpaid: overview.unpaid_commission > 0.0,
        total_unpaid: overview.unpaid_commission,
        list,
    };

    Ok(Json(ApiResponse::data(DashboardData { overview, unpaid_commissions })))
}

pub async fn overview(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<ApiResponse<Overview>>, AppError> {
    let (month, year) = month_year_or_now(query.month, query.year);
    let overview = overview_for(&db_pool, auth.user_id, month, year).await?;
    Ok(Json(ApiResponse::data(overview)))
}

pub async fn unpaid_commissions(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<UnpaidCommissionsData>>, AppError> {
    let rows = unpaid_rows(&db_pool, auth.user_id).await?;
    let total_unpaid: f64 = rows.iter().map(|r| r.commission).sum();
    let groups = group_unpaid_commissions(rows);

    Ok(Json(ApiResponse::data(UnpaidCommissionsData {
        has_unpaid: total_unpaid > 0.0,
        total_unpaid,
        unpaid_commissions: groups,
    })))
}

pub async fn monthly_stats(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<YearQuery>,
) -> Result<Json<ApiResponse<Vec<MonthlyStat>>>, AppError> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let sales = monthly_sums(
        &db_pool,
        auth.user_id,
        year,
        "SELECT EXTRACT(MONTH FROM sale_date)::INT AS month, \
         COALESCE(SUM(price * quantity), 0)::FLOAT8 AS total \
         FROM sales WHERE user_id = $1 AND EXTRACT(YEAR FROM sale_date)::INT = $2 \
         GROUP BY 1",
    )
    .await?;
    let expenses = monthly_sums(
        &db_pool,
        auth.user_id,
        year,
        "SELECT EXTRACT(MONTH FROM expense_date)::INT AS month, \
         COALESCE(SUM(amount), 0)::FLOAT8 AS total \
         FROM expenses WHERE user_id = $1 AND EXTRACT(YEAR FROM expense_date)::INT = $2 \
         GROUP BY 1",
    )
    .await?;

    Ok(Json(ApiResponse::data(build_monthly_series(&sales, &expenses))))
}

pub async fn history(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<HistoryData>>, AppError> {
    let (month, year) = month_year_or_now(query.month, query.year);
    let kind = query.kind.unwrap_or_else(|| "both".to_string());

    let mut data = HistoryData { sales: None, expenses: None };

    if kind == "sales" || kind == "both" {
        let mut sql = format!(
            "{SALE_SELECT} WHERE s.user_id = $1 \
             AND EXTRACT(MONTH FROM s.sale_date)::INT = $2 \
             AND EXTRACT(YEAR FROM s.sale_date)::INT = $3 \
             ORDER BY s.sale_date DESC"
        );
        if query.limit.is_some() {
            sql.push_str(" LIMIT $4");
        }
        let mut rows_query = sqlx::query_as::<_, SaleWithSupplierRow>(&sql)
            .bind(auth.user_id)
            .bind(month)
            .bind(year);
        if let Some(limit) = query.limit {
            rows_query = rows_query.bind(limit);
        }
        let rows = rows_query.fetch_all(&db_pool).await?;
        data.sales = Some(rows.into_iter().map(SaleResponse::from).collect());
    }

    if kind == "expenses" || kind == "both" {
        let mut sql = String::from(
            "SELECT id, user_id, title, (amount)::FLOAT8 AS amount, description, expense_date, \
             created_at, updated_at FROM expenses WHERE user_id = $1 \
             AND EXTRACT(MONTH FROM expense_date)::INT = $2 \
             AND EXTRACT(YEAR FROM expense_date)::INT = $3 \
             ORDER BY expense_date DESC",
        );
        if query.limit.is_some() {
            sql.push_str(" LIMIT $4");
        }
        let mut rows_query = sqlx::query_as::<_, Expense>(&sql)
            .bind(auth.user_id)
            .bind(month)
            .bind(year);
        if let Some(limit) = query.limit {
            rows_query = rows_query.bind(limit);
        }
        data.expenses = Some(rows_query.fetch_all(&db_pool).await?);
    }

    Ok(Json(ApiResponse::data(data)))
}

fn month_year_or_now(month: Option<i32>, year: Option<i32>) -> (i32, i32) {
    let now = Utc::now();
    (month.unwrap_or(now.month() as i32), year.unwrap_or(now.year()))
}

async fn overview_for(
    db_pool: &PgPool,
    user_id: i64,
    month: i32,
    year: i32,
) -> Result<Overview, AppError> {
    let total_sales = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(price * quantity), 0)::FLOAT8 FROM sales \
         WHERE user_id = $1 AND EXTRACT(MONTH FROM sale_date)::INT = $2 \
         AND EXTRACT(YEAR FROM sale_date)::INT = $3",
    )
    .bind(user_id)
    .bind(month)
    .bind(year)
    .fetch_one(db_pool)
    .await?;

    let total_expenses = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(amount), 0)::FLOAT8 FROM expenses \
         WHERE user_id = $1 AND EXTRACT(MONTH FROM expense_date)::INT = $2 \
         AND EXTRACT(YEAR FROM expense_date)::INT = $3",
    )
    .bind(user_id)
    .bind(month)
    .bind(year)
    .fetch_one(db_pool)
    .await?;

    let total_products = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM sales \
         WHERE user_id = $1 AND EXTRACT(MONTH FROM sale_date)::INT = $2 \
         AND EXTRACT(YEAR FROM sale_date)::INT = $3",
    )
    .bind(user_id)
    .bind(month)
    .bind(year)
    .fetch_one(db_pool)
    .await?;

    let commission_paid = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(commission), 0)::FLOAT8 FROM sales \
         WHERE user_id = $1 AND commission_paid = TRUE \
         AND EXTRACT(MONTH FROM sale_date)::INT = $2 \
         AND EXTRACT(YEAR FROM sale_date)::INT = $3",
    )
    .bind(user_id)
    .bind(month)
    .bind(year)
    .fetch_one(db_pool)
    .await?;

    // Deliberately not month-scoped: unpaid commission is a running balance.
    let unpaid_commission = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(commission), 0)::FLOAT8 FROM sales \
         WHERE user_id = $1 AND commission_paid = FALSE",
    )
    .bind(user_id)
    .fetch_one(db_pool)
    .await?;

    Ok(assemble_overview(
        total_sales,
        total_expenses,
        total_products,
        commission_paid,
        unpaid_commission,
        month,
        year,
    ))
}

fn assemble_overview(
    total_sales: f64,
    total_expenses: f64,
    total_products: i64,
    commission_paid: f64,
    unpaid_commission: f64,
    month: i32,
    year: i32,
) -> Overview {
    Overview {
        total_sales,
        total_expenses,
        total_products,
        commission_paid,
        unpaid_commission,
        net_profit: total_sales - total_expenses,
        month,
        year,
    }
}

async fn unpaid_rows(db_pool: &PgPool, user_id: i64) -> Result<Vec<UnpaidSaleRow>, AppError> {
    let rows = sqlx::query_as::<_, UnpaidSaleRow>(
        "SELECT s.id, s.supplier_id, sup.name AS supplier_name, sup.email AS supplier_email, \
         sup.phone AS supplier_phone, s.product_name, (s.commission)::FLOAT8 AS commission, \
         s.sale_date, s.quantity, (s.price)::FLOAT8 AS price \
         FROM sales s LEFT JOIN suppliers sup ON s.supplier_id = sup.id \
         WHERE s.user_id = $1 AND s.commission_paid = FALSE AND s.commission > 0 \
         ORDER BY s.sale_date DESC, s.id DESC",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;
    Ok(rows)
}

async fn monthly_sums(
    db_pool: &PgPool,
    user_id: i64,
    year: i32,
    sql: &str,
) -> Result<Vec<(i32, f64)>, AppError> {
    let rows = sqlx::query_as::<_, (i32, f64)>(sql)
        .bind(user_id)
        .bind(year)
        .fetch_all(db_pool)
        .await?;
    Ok(rows)
}

/// Group unpaid sales by supplier, preserving the first-seen order of the
/// date-descending input. Sales with no supplier share one bucket.
fn group_unpaid_commissions(rows: Vec<UnpaidSaleRow>) -> Vec<UnpaidCommissionGroup> {
    let mut groups: Vec<UnpaidCommissionGroup> = Vec::new();
    let mut index: HashMap<Option<i64>, usize> = HashMap::new();

    for row in rows {
        let position = *index.entry(row.supplier_id).or_insert_with(|| {
            let supplier = match (row.supplier_id, row.supplier_name.clone()) {
                (Some(id), Some(name)) => Some(SupplierSummary {
                    id,
                    name,
                    email: row.supplier_email.clone(),
                    phone: row.supplier_phone.clone(),
                }),
                _ => None,
            };
            groups.push(UnpaidCommissionGroup {
                supplier_id: row.supplier_id,
                supplier_name: row
                    .supplier_name
                    .clone()
                    .unwrap_or_else(|| "No Supplier".to_string()),
                supplier,
                total_commission: 0.0,
                sales_count: 0,
                products: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[position];
        group.total_commission += row.commission;
        group.sales_count += 1;
        group.products.push(UnpaidProduct {
            id: row.id,
            product_name: row.product_name,
            commission: row.commission,
            sale_date: row.sale_date,
            quantity: row.quantity,
            price: row.price,
            total_amount: row.price * row.quantity as f64,
        });
    }

    groups
}

/// Always 12 entries, months 1-12 in order; months without activity report
/// zero rather than being absent.
fn build_monthly_series(sales: &[(i32, f64)], expenses: &[(i32, f64)]) -> Vec<MonthlyStat> {
    (1..=12)
        .map(|month| {
            let month_sales = sum_for_month(sales, month);
            let month_expenses = sum_for_month(expenses, month);
            MonthlyStat {
                month,
                month_name: MONTH_NAMES[(month - 1) as usize],
                sales: month_sales,
                expenses: month_expenses,
                profit: month_sales - month_expenses,
            }
        })
        .collect()
}

fn sum_for_month(rows: &[(i32, f64)], month: i32) -> f64 {
    rows.iter()
        .find(|(m, _)| *m == month)
        .map(|(_, total)| *total)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(
        id: i64,
        supplier: Option<(i64, &str)>,
        commission: f64,
        date: (i32, u32, u32),
        quantity: i32,
        price: f64,
    ) -> UnpaidSaleRow {
        UnpaidSaleRow {
            id,
            supplier_id: supplier.map(|(sid, _)| sid),
            supplier_name: supplier.map(|(_, name)| name.to_string()),
            supplier_email: None,
            supplier_phone: None,
            product_name: format!("Product {id}"),
            commission,
            sale_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            quantity,
            price,
        }
    }

    #[test]
    fn no_supplier_sales_share_one_bucket() {
        let groups = group_unpaid_commissions(vec![
            row(1, None, 10.0, (2025, 3, 9), 2, 100.0),
            row(2, Some((5, "Acme")), 4.0, (2025, 3, 8), 1, 40.0),
            row(3, None, 2.5, (2025, 3, 7), 1, 25.0),
        ]);

        assert_eq!(groups.len(), 2);
        let no_supplier = &groups[0];
        assert_eq!(no_supplier.supplier_id, None);
        assert_eq!(no_supplier.supplier_name, "No Supplier");
        assert!(no_supplier.supplier.is_none());
        assert_eq!(no_supplier.total_commission, 12.5);
        assert_eq!(no_supplier.sales_count, 2);
        assert_eq!(no_supplier.products.len(), 2);
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let groups = group_unpaid_commissions(vec![
            row(1, Some((2, "Beta")), 1.0, (2025, 5, 3), 1, 10.0),
            row(2, Some((1, "Alpha")), 1.0, (2025, 5, 2), 1, 10.0),
            row(3, Some((2, "Beta")), 1.0, (2025, 5, 1), 1, 10.0),
        ]);

        let order: Vec<Option<i64>> = groups.iter().map(|g| g.supplier_id).collect();
        assert_eq!(order, vec![Some(2), Some(1)]);
        assert_eq!(groups[0].sales_count, 2);
    }

    #[test]
    fn line_items_carry_sale_details() {
        let groups = group_unpaid_commissions(vec![row(
            7,
            Some((3, "Acme")),
            10.0,
            (2025, 1, 10),
            2,
            100.0,
        )]);

        let product = &groups[0].products[0];
        assert_eq!(product.id, 7);
        assert_eq!(product.quantity, 2);
        assert_eq!(product.total_amount, 200.0);
        assert_eq!(groups[0].supplier.as_ref().unwrap().name, "Acme");
    }

    // Sales on 2025-01-10 ($100 x2, $10 commission, unpaid) and 2025-02-05
    // ($50 x1, $5 commission, paid). Viewing January: the month sums see only
    // the January sale, the unpaid balance still sees every unpaid sale.
    #[test]
    fn overview_unpaid_balance_is_not_month_scoped() {
        let overview = assemble_overview(200.0, 30.0, 2, 0.0, 10.0, 1, 2025);
        assert_eq!(overview.total_sales, 200.0);
        assert_eq!(overview.total_products, 2);
        assert_eq!(overview.commission_paid, 0.0);
        assert_eq!(overview.unpaid_commission, 10.0);
        assert_eq!(overview.net_profit, 170.0);
        assert_eq!((overview.month, overview.year), (1, 2025));
    }

    #[test]
    fn monthly_series_has_twelve_zero_filled_entries() {
        let series = build_monthly_series(&[(2, 500.0)], &[(2, 120.0), (7, 30.0)]);

        assert_eq!(series.len(), 12);
        for (i, stat) in series.iter().enumerate() {
            assert_eq!(stat.month, (i + 1) as i32);
            assert_eq!(stat.profit, stat.sales - stat.expenses);
        }
        assert_eq!(series[1].sales, 500.0);
        assert_eq!(series[1].profit, 380.0);
        assert_eq!(series[6].profit, -30.0);
        assert_eq!(series[0].sales, 0.0);
        assert_eq!(series[11].expenses, 0.0);
        assert_eq!(series[0].month_name, "January");
        assert_eq!(series[11].month_name, "December");
    }
}
