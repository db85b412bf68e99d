use serde::Serialize;
use chrono::{DateTime, Utc};

#[derive(sqlx::FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_premium: bool,
    pub premium_expires_at: Option<DateTime<Utc>>,
    pub theme: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_premium_active(&self) -> bool {
        self.is_premium
            && self.premium_expires_at.map_or(false, |expires| expires > Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(is_premium: bool, expires: Option<DateTime<Utc>>) -> User {
        User {
            id: 1,
            name: "Jane Doe".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: "jane@example.com".into(),
            phone_number: "+15550001111".into(),
            password_hash: String::new(),
            is_premium,
            premium_expires_at: expires,
            theme: "light".into(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn premium_requires_flag_and_future_expiry() {
        assert!(user(true, Some(Utc::now() + Duration::days(1))).is_premium_active());
        assert!(!user(true, Some(Utc::now() - Duration::days(1))).is_premium_active());
        assert!(!user(true, None).is_premium_active());
        assert!(!user(false, Some(Utc::now() + Duration::days(1))).is_premium_active());
    }

    #[test]
    fn password_hash_never_serializes() {
        let v = serde_json::to_value(user(false, None)).unwrap();
        assert!(v.get("password_hash").is_none());
        assert_eq!(v["email"], "jane@example.com");
    }
}
