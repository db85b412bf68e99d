/// One key/value pair from user_settings; `kind` is the stored type tag.
#[derive(sqlx::FromRow)]
pub struct SettingRow {
    pub key: String,
    pub value: String,
    #[sqlx(rename = "type")]
    pub kind: String,
}
