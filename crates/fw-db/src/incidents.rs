use fw_integrity::IncidentSink;
use fw_schemas::{EngineError, IntegrityAlert};
use sqlx::PgPool;
use uuid::Uuid;

/// Records integrity alerts as `OPEN` incidents.
#[derive(Clone)]
pub struct PgIncidentSink {
    pool: PgPool,
}

impl PgIncidentSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IncidentSink for PgIncidentSink {
    async fn create_incident(&self, alert: &IntegrityAlert) -> Result<String, EngineError> {
        let incident_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            insert into incidents (
              incident_id, driver_id, alert_type, description, severity,
              lat, lng, speed_kph, shift_id, trip_id, created_at
            ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&incident_id)
        .bind(&alert.driver_id)
        .bind(alert.alert_type.as_str())
        .bind(&alert.description)
        .bind(i16::from(alert.severity))
        .bind(alert.location.lat)
        .bind(alert.location.lng)
        .bind(alert.speed_kph)
        .bind(&alert.shift_id)
        .bind(&alert.trip_id)
        .bind(alert.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::infra("insert incident", e))?;
        Ok(incident_id)
    }
}
