//! Row structs that map 1-to-1 onto database tables, plus the composed
//! `RequestDetails` aggregate and the write records the stores accept.
//!
//! These are *persistence* models. Parameter defaults (status, quantity)
//! are resolved by the `service` crate before anything reaches this layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// accounts
// ---------------------------------------------------------------------------

/// A login identity. Only `email` is ever exposed through request reads.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// refresh_tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRow {
    pub id: i64,
    pub account_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_by_ip: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by_ip: Option<String>,
    pub replaced_by_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// departments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DepartmentRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// employees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployeeRow {
    pub id: i64,
    pub account_id: i64,
    /// `None` once the department has been removed.
    pub department_id: Option<i64>,
    pub position: String,
    pub hire_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// workflows
// ---------------------------------------------------------------------------

/// An onboarding/offboarding (or similar) workflow attached to an employee.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowRow {
    pub id: i64,
    pub employee_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-form JSON payload describing the workflow steps.
    pub details: Json<serde_json::Value>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// requests
// ---------------------------------------------------------------------------

/// The application-defined set of request states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending"   => Ok(Self::Pending),
            "approved"  => Ok(Self::Approved),
            "rejected"  => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other       => Err(format!("unknown request status: {other}")),
        }
    }
}

/// A `requests` row joined with its employee and the employee's account email.
#[derive(Debug, Clone, FromRow)]
pub struct RequestJoinRow {
    pub id: i64,
    pub employee_id: i64,
    pub kind: String,
    pub status: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub account_id: i64,
    pub department_id: Option<i64>,
    pub position: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// request_items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RequestItemRow {
    pub id: i64,
    pub request_id: i64,
    pub name: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// The owning account, restricted to its identity field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEmail {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSummary {
    pub id: i64,
    pub account_id: i64,
    pub department_id: Option<i64>,
    pub position: String,
    pub account: AccountEmail,
}

/// A request together with its employee and its items in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetails {
    pub id: i64,
    pub employee_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: RequestStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub employee: EmployeeSummary,
    pub items: Vec<RequestItemRow>,
}

impl RequestDetails {
    /// Assemble the aggregate from a joined row and the request's items.
    pub fn from_parts(row: RequestJoinRow, items: Vec<RequestItemRow>) -> Result<Self, crate::DbError> {
        let status = row
            .status
            .parse()
            .map_err(|_| crate::DbError::InvalidStatus(row.status.clone()))?;

        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            kind: row.kind,
            status,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
            employee: EmployeeSummary {
                id: row.employee_id,
                account_id: row.account_id,
                department_id: row.department_id,
                position: row.position,
                account: AccountEmail { email: row.email },
            },
            items,
        })
    }
}

// ---------------------------------------------------------------------------
// Write records
// ---------------------------------------------------------------------------

/// The mutable scalar columns of a request, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFields {
    pub kind: String,
    pub status: RequestStatus,
    pub description: Option<String>,
}

/// A request item ready for insertion (quantity already defaulted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequestItem {
    pub name: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub employee_id: i64,
    pub fields: RequestFields,
    pub items: Vec<NewRequestItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join_row(status: &str) -> RequestJoinRow {
        let now = Utc::now();
        RequestJoinRow {
            id: 7,
            employee_id: 3,
            kind: "equipment".into(),
            status: status.into(),
            description: None,
            created_at: now,
            updated_at: now,
            account_id: 11,
            department_id: Some(2),
            position: "Engineer".into(),
            email: "ada@example.com".into(),
        }
    }

    #[test]
    fn status_text_round_trips_through_display_and_from_str() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::Completed,
            RequestStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<RequestStatus>(), Ok(status));
        }
        assert!("on_hold".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn default_status_is_pending() {
        assert_eq!(RequestStatus::default(), RequestStatus::Pending);
    }

    #[test]
    fn aggregate_nests_employee_and_account_email() {
        let details = RequestDetails::from_parts(join_row("approved"), vec![]).unwrap();
        assert_eq!(details.status, RequestStatus::Approved);
        assert_eq!(details.employee.id, 3);
        assert_eq!(details.employee.account.email, "ada@example.com");
    }

    #[test]
    fn unknown_stored_status_is_a_decode_error() {
        let err = RequestDetails::from_parts(join_row("archived"), vec![]).unwrap_err();
        assert!(matches!(err, crate::DbError::InvalidStatus(s) if s == "archived"));
    }

    #[test]
    fn aggregate_serialises_kind_as_type() {
        let details = RequestDetails::from_parts(join_row("pending"), vec![]).unwrap();
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["type"], "equipment");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["employee"]["account"]["email"], "ada@example.com");
    }
}
