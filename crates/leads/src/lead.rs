//! Lead store: find-or-create by (tenant, phone), stage moves, temperature
//! transitions, soft deletes.

use {
    anyhow::Result,
    serde::{Deserialize, Serialize},
    sqlx::SqlitePool,
    tracing::debug,
};

use zapcrm_common::{Temperature, now_ms};

use crate::activity::{self, NewActivity, activity_type};

/// Stage assigned to a lead created from its first inbound message.
pub const INITIAL_STATUS: &str = "new";

/// A contact tracked through the sales pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Lead {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub estimated_value: f64,
    pub status: String,
    pub temperature: Temperature,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Payload for creating a lead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    pub estimated_value: f64,
    pub status: Option<String>,
    pub temperature: Option<Temperature>,
}

impl NewLead {
    /// Placeholder lead for a first-time contact: the phone number stands in
    /// for the name until someone edits it.
    #[must_use]
    pub fn from_contact(phone: &str) -> Self {
        Self {
            name: phone.to_string(),
            phone: Some(phone.to_string()),
            ..Self::default()
        }
    }
}

#[derive(sqlx::FromRow)]
struct LeadRow {
    id: String,
    tenant_id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    company: Option<String>,
    estimated_value: f64,
    status: String,
    temperature: String,
    created_at: i64,
    updated_at: i64,
}

impl From<LeadRow> for Lead {
    fn from(r: LeadRow) -> Self {
        Self {
            id: r.id,
            tenant_id: r.tenant_id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            company: r.company,
            estimated_value: r.estimated_value,
            status: r.status,
            temperature: Temperature::coerce(&r.temperature),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const LEAD_COLUMNS: &str = "id, tenant_id, name, email, phone, company, estimated_value, \
                            status, temperature, created_at, updated_at";

/// SQLite-backed lead store.
pub struct SqliteLeadStore {
    pool: SqlitePool,
}

impl SqliteLeadStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the leads table schema.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS leads (
                id              TEXT    PRIMARY KEY,
                tenant_id       TEXT    NOT NULL,
                name            TEXT    NOT NULL,
                email           TEXT,
                phone           TEXT,
                company         TEXT,
                estimated_value REAL    NOT NULL DEFAULT 0,
                status          TEXT    NOT NULL DEFAULT 'new',
                temperature     TEXT    NOT NULL DEFAULT 'cold',
                created_at      INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL,
                deleted_at      INTEGER
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_leads_tenant_phone ON leads (tenant_id, phone)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn create(&self, tenant_id: &str, lead: NewLead) -> Result<Lead> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_ms();
        let status = lead.status.unwrap_or_else(|| INITIAL_STATUS.to_string());
        let temperature = lead.temperature.unwrap_or(Temperature::Cold);

        sqlx::query(
            "INSERT INTO leads
             (id, tenant_id, name, email, phone, company, estimated_value,
              status, temperature, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(tenant_id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.company)
        .bind(lead.estimated_value)
        .bind(&status)
        .bind(temperature.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(tenant_id, lead_id = %id, phone = ?lead.phone, "lead created");

        Ok(Lead {
            id,
            tenant_id: tenant_id.to_string(),
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            company: lead.company,
            estimated_value: lead.estimated_value,
            status,
            temperature,
            created_at: now,
            updated_at: now,
        })
    }

    /// Exact phone match within a tenant; tombstoned leads are invisible.
    pub async fn find_by_phone(&self, tenant_id: &str, phone: &str) -> Result<Option<Lead>> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads
             WHERE tenant_id = ? AND phone = ? AND deleted_at IS NULL"
        ))
        .bind(tenant_id)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> Result<Option<Lead>> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads
             WHERE tenant_id = ? AND id = ? AND deleted_at IS NULL"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// All live leads for a tenant, newest first.
    pub async fn list(&self, tenant_id: &str) -> Result<Vec<Lead>> {
        let rows = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads
             WHERE tenant_id = ? AND deleted_at IS NULL
             ORDER BY created_at DESC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Move a lead to a new pipeline stage, recording a `status_changed`
    /// activity in the same transaction. Returns the updated lead, or
    /// `None` if the lead does not exist (or is tombstoned).
    pub async fn update_status(
        &self,
        tenant_id: &str,
        id: &str,
        new_status: &str,
    ) -> Result<Option<Lead>> {
        let Some(lead) = self.get(tenant_id, id).await? else {
            return Ok(None);
        };

        let now = now_ms();
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE leads SET status = ?, updated_at = ? WHERE id = ? AND tenant_id = ?")
            .bind(new_status)
            .bind(now)
            .bind(id)
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?;

        let activity = NewActivity::new(
            tenant_id,
            id,
            activity_type::STATUS_CHANGED,
            format!("Pipeline stage moved to \"{new_status}\""),
            serde_json::json!({ "from": lead.status.clone(), "to": new_status }),
        );
        activity::insert_row(
            &mut tx,
            &activity,
            &uuid::Uuid::new_v4().to_string(),
            now,
        )
        .await?;

        tx.commit().await?;

        Ok(Some(Lead {
            status: new_status.to_string(),
            updated_at: now,
            ..lead
        }))
    }

    /// Tombstone a lead. The row stays for the audit trail; it just stops
    /// appearing in lookups.
    pub async fn soft_delete(&self, tenant_id: &str, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE leads SET deleted_at = ? WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL",
        )
        .bind(now_ms())
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Commit one processed message exchange atomically: the temperature
    /// mutation (when it actually changes) and every activity row land in a
    /// single transaction, or none of them do.
    pub async fn commit_exchange(
        &self,
        lead: &Lead,
        temperature: Temperature,
        activities: Vec<NewActivity>,
    ) -> Result<()> {
        let now = now_ms();
        let mut tx = self.pool.begin().await?;

        if temperature != lead.temperature {
            sqlx::query(
                "UPDATE leads SET temperature = ?, updated_at = ? WHERE id = ? AND tenant_id = ?",
            )
            .bind(temperature.as_str())
            .bind(now)
            .bind(&lead.id)
            .bind(&lead.tenant_id)
            .execute(&mut *tx)
            .await?;
        }

        for activity in &activities {
            activity::insert_row(&mut tx, activity, &uuid::Uuid::new_v4().to_string(), now)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
