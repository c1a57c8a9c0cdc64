//! Account storage repository.
//!
//! The "default incoming" and "default outgoing" slots live in a separate
//! `account_defaults` table keyed by role, so holding a slot is a single-row
//! upsert instead of a rewrite of every other account.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use super::model::{
    Account, AccountId, AutoReplySettings, DefaultRole, IncomingConfig, OutgoingConfig, Security,
    UnrepliedSettings,
};
use crate::store::format_timestamp;
use crate::{Error, Result};

pub(crate) const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        service TEXT,
        incoming_enabled INTEGER NOT NULL DEFAULT 0,
        pop3_host TEXT NOT NULL,
        pop3_port INTEGER NOT NULL,
        pop3_security TEXT NOT NULL,
        pop3_username TEXT NOT NULL,
        pop3_password TEXT NOT NULL,
        outgoing_enabled INTEGER NOT NULL DEFAULT 0,
        smtp_host TEXT NOT NULL,
        smtp_port INTEGER NOT NULL,
        smtp_security TEXT NOT NULL,
        smtp_username TEXT NOT NULL,
        smtp_password TEXT NOT NULL,
        append_to TEXT,
        auto_reply_enabled INTEGER NOT NULL DEFAULT 0,
        auto_reply_message TEXT NOT NULL DEFAULT '',
        notify_unreplied INTEGER NOT NULL DEFAULT 0,
        notification_recipients TEXT NOT NULL DEFAULT '',
        unreplied_minutes INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS account_defaults (
        role TEXT PRIMARY KEY,
        account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE
    )
    ",
];

const SELECT_ACCOUNT: &str = r"
    SELECT a.*,
           EXISTS(SELECT 1 FROM account_defaults d
                  WHERE d.account_id = a.id AND d.role = 'incoming') AS default_incoming,
           EXISTS(SELECT 1 FROM account_defaults d
                  WHERE d.account_id = a.id AND d.role = 'outgoing') AS default_outgoing
    FROM accounts a
";

/// Repository for account storage and retrieval.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Creates a repository over an open pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get all accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!("{SELECT_ACCOUNT} ORDER BY a.name ASC, a.id ASC"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_account).collect())
    }

    /// Get every account with incoming mail enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_incoming(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ACCOUNT} WHERE a.incoming_enabled = 1 ORDER BY a.id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_account).collect())
    }

    /// Get account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE a.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_account))
    }

    /// Get the account holding a default slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn default_account(&self, role: DefaultRole) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "{SELECT_ACCOUNT} JOIN account_defaults r ON r.account_id = a.id WHERE r.role = ?"
        ))
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_account))
    }

    /// Save an account (insert or update) and its default slots in one
    /// transaction.
    ///
    /// Claiming a slot takes it from whichever account held it. Releasing a
    /// slot only clears it if this account holds it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if another account uses the same address,
    /// or a database error.
    pub async fn save(&self, account: &mut Account) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let now = format_timestamp(Utc::now());

        let id = if let Some(id) = account.id {
            let result = sqlx::query(
                r"
                UPDATE accounts SET
                    name = ?, email = ?, service = ?,
                    incoming_enabled = ?, pop3_host = ?, pop3_port = ?, pop3_security = ?,
                    pop3_username = ?, pop3_password = ?,
                    outgoing_enabled = ?, smtp_host = ?, smtp_port = ?, smtp_security = ?,
                    smtp_username = ?, smtp_password = ?,
                    append_to = ?, auto_reply_enabled = ?, auto_reply_message = ?,
                    notify_unreplied = ?, notification_recipients = ?, unreplied_minutes = ?,
                    updated_at = ?
                WHERE id = ?
                ",
            )
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.service)
            .bind(account.incoming.enabled)
            .bind(&account.incoming.host)
            .bind(i64::from(account.incoming.port))
            .bind(account.incoming.security.as_str())
            .bind(&account.incoming.username)
            .bind(&account.incoming.password)
            .bind(account.outgoing.enabled)
            .bind(&account.outgoing.host)
            .bind(i64::from(account.outgoing.port))
            .bind(account.outgoing.security.as_str())
            .bind(&account.outgoing.username)
            .bind(&account.outgoing.password)
            .bind(&account.append_to)
            .bind(account.auto_reply.enabled)
            .bind(&account.auto_reply.message)
            .bind(account.unreplied.enabled)
            .bind(&account.unreplied.recipients)
            .bind(account.unreplied.minutes.map(i64::from))
            .bind(&now)
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::from_insert(e, &account.email))?;

            if result.rows_affected() == 0 {
                return Err(Error::AccountNotFound(id.to_string()));
            }
            id
        } else {
            let result = sqlx::query(
                r"
                INSERT INTO accounts (
                    name, email, service,
                    incoming_enabled, pop3_host, pop3_port, pop3_security,
                    pop3_username, pop3_password,
                    outgoing_enabled, smtp_host, smtp_port, smtp_security,
                    smtp_username, smtp_password,
                    append_to, auto_reply_enabled, auto_reply_message,
                    notify_unreplied, notification_recipients, unreplied_minutes,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.service)
            .bind(account.incoming.enabled)
            .bind(&account.incoming.host)
            .bind(i64::from(account.incoming.port))
            .bind(account.incoming.security.as_str())
            .bind(&account.incoming.username)
            .bind(&account.incoming.password)
            .bind(account.outgoing.enabled)
            .bind(&account.outgoing.host)
            .bind(i64::from(account.outgoing.port))
            .bind(account.outgoing.security.as_str())
            .bind(&account.outgoing.username)
            .bind(&account.outgoing.password)
            .bind(&account.append_to)
            .bind(account.auto_reply.enabled)
            .bind(&account.auto_reply.message)
            .bind(account.unreplied.enabled)
            .bind(&account.unreplied.recipients)
            .bind(account.unreplied.minutes.map(i64::from))
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::from_insert(e, &account.email))?;

            let new_id = AccountId::new(result.last_insert_rowid());
            account.id = Some(new_id);
            new_id
        };

        for role in DefaultRole::ALL {
            update_default_slot(&mut tx, id, role, account.is_default_for(role)).await?;
        }

        tx.commit().await?;
        debug!(account = %id, email = %account.email, "Account saved");
        Ok(())
    }

    /// Delete an account.
    ///
    /// Conversation entries of the account are detached (their account
    /// reference is cleared), never deleted. Default slots held by the
    /// account are released.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no such account exists, or a
    /// database error.
    pub async fn delete(&self, id: AccountId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let detached = sqlx::query("UPDATE conversations SET account_id = NULL WHERE account_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM account_defaults WHERE account_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(Error::AccountNotFound(id.to_string()));
        }

        tx.commit().await?;
        info!(account = %id, detached, "Account deleted");
        Ok(())
    }
}

async fn update_default_slot(
    conn: &mut SqliteConnection,
    id: AccountId,
    role: DefaultRole,
    holds: bool,
) -> Result<()> {
    if holds {
        sqlx::query(
            r"
            INSERT INTO account_defaults (role, account_id) VALUES (?, ?)
            ON CONFLICT(role) DO UPDATE SET account_id = excluded.account_id
            ",
        )
        .bind(role.as_str())
        .bind(id.0)
        .execute(&mut *conn)
        .await?;
    } else {
        sqlx::query("DELETE FROM account_defaults WHERE role = ? AND account_id = ?")
            .bind(role.as_str())
            .bind(id.0)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Convert a database row to an Account.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn row_to_account(row: &SqliteRow) -> Account {
    Account {
        id: Some(AccountId::new(row.get("id"))),
        name: row.get("name"),
        email: row.get("email"),
        service: row.get("service"),
        incoming: IncomingConfig {
            enabled: row.get("incoming_enabled"),
            host: row.get("pop3_host"),
            port: row.get::<i64, _>("pop3_port") as u16,
            security: Security::from_db(row.get("pop3_security")),
            username: row.get("pop3_username"),
            password: row.get("pop3_password"),
        },
        outgoing: OutgoingConfig {
            enabled: row.get("outgoing_enabled"),
            host: row.get("smtp_host"),
            port: row.get::<i64, _>("smtp_port") as u16,
            security: Security::from_db(row.get("smtp_security")),
            username: row.get("smtp_username"),
            password: row.get("smtp_password"),
        },
        append_to: row.get("append_to"),
        auto_reply: AutoReplySettings {
            enabled: row.get("auto_reply_enabled"),
            message: row.get("auto_reply_message"),
        },
        unreplied: UnrepliedSettings {
            enabled: row.get("notify_unreplied"),
            recipients: row.get("notification_recipients"),
            minutes: row
                .get::<Option<i64>, _>("unreplied_minutes")
                .map(|m| m as u32),
        },
        default_incoming: row.get("default_incoming"),
        default_outgoing: row.get("default_outgoing"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::store::Store;
    use crate::{Account, DefaultRole, Error};

    fn account(email: &str) -> Account {
        let mut account = Account::with_email(email);
        account.name = email.to_string();
        account
    }

    #[tokio::test]
    async fn test_create_and_retrieve_account() {
        let repo = Store::in_memory().await.unwrap().accounts();

        let mut account = account("test@example.com");
        account.incoming.password = "secret".to_string();
        account.unreplied.minutes = Some(45);
        account.append_to = Some("Issue".into());

        repo.save(&mut account).await.unwrap();
        let retrieved = repo.get(account.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(retrieved, account);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let repo = Store::in_memory().await.unwrap().accounts();

        repo.save(&mut account("dup@example.com")).await.unwrap();
        let err = repo.save(&mut account("dup@example.com")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_default_slots_move_between_accounts() {
        let repo = Store::in_memory().await.unwrap().accounts();

        let mut first = account("first@example.com");
        first.default_incoming = true;
        first.default_outgoing = true;
        repo.save(&mut first).await.unwrap();

        let mut second = account("second@example.com");
        second.default_incoming = true;
        repo.save(&mut second).await.unwrap();

        let incoming = repo.default_account(DefaultRole::Incoming).await.unwrap().unwrap();
        let outgoing = repo.default_account(DefaultRole::Outgoing).await.unwrap().unwrap();
        assert_eq!(incoming.id, second.id);
        assert_eq!(outgoing.id, first.id);

        let first = repo.get(first.id.unwrap()).await.unwrap().unwrap();
        assert!(!first.default_incoming);
        assert!(first.default_outgoing);
    }

    #[tokio::test]
    async fn test_releasing_a_slot_someone_else_holds_is_noop() {
        let repo = Store::in_memory().await.unwrap().accounts();

        let mut holder = account("holder@example.com");
        holder.default_outgoing = true;
        repo.save(&mut holder).await.unwrap();

        let mut other = account("other@example.com");
        other.default_outgoing = false;
        repo.save(&mut other).await.unwrap();

        let outgoing = repo.default_account(DefaultRole::Outgoing).await.unwrap().unwrap();
        assert_eq!(outgoing.id, holder.id);
    }

    #[tokio::test]
    async fn test_delete_releases_slots() {
        let repo = Store::in_memory().await.unwrap().accounts();

        let mut account = account("gone@example.com");
        account.default_incoming = true;
        repo.save(&mut account).await.unwrap();

        repo.delete(account.id.unwrap()).await.unwrap();
        assert!(repo.default_account(DefaultRole::Incoming).await.unwrap().is_none());
        assert!(repo.list().await.unwrap().is_empty());
        assert!(matches!(
            repo.delete(account.id.unwrap()).await,
            Err(Error::AccountNotFound(_))
        ));
    }
}
