use async_trait::async_trait;
use chrono::{DateTime, Utc};
use despacho_order::models::{TransitionRecord, WalletValidationRecord};
use despacho_order::repository::{OrderRepository, RepositoryError};
use despacho_order::{ItemVerification, Order, OrderItem, OrderLedger, PackagingSession};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use uuid::Uuid;

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct SessionRow {
    sealed: bool,
    started_at: Option<DateTime<Utc>>,
}

fn order_from_row(row: &PgRow) -> Result<Order, RepositoryError> {
    Ok(Order {
        id: row.try_get("id")?,
        order_number: row.try_get("order_number")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        payment_method: row.try_get::<String, _>("payment_method")?.parse()?,
        total_amount: row.try_get::<Decimal, _>("total_amount")?,
        validation_status: row.try_get::<String, _>("validation_status")?.parse()?,
        validation_notes: row.try_get("validation_notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn item_from_row(row: &PgRow) -> Result<OrderItem, RepositoryError> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        product_code: row.try_get("product_code")?,
        description: row.try_get("description")?,
        quantity: u32::try_from(row.try_get::<i32, _>("quantity")?)?,
    })
}

fn verification_from_row(row: &PgRow) -> Result<ItemVerification, RepositoryError> {
    Ok(ItemVerification {
        order_item_id: row.try_get("order_item_id")?,
        required_scans: u32::try_from(row.try_get::<i32, _>("required_scans")?)?,
        scanned_count: u32::try_from(row.try_get::<i32, _>("scanned_count")?)?,
        is_verified: row.try_get("is_verified")?,
        last_scanned_at: row.try_get("last_scanned_at")?,
    })
}

fn transition_from_row(row: &PgRow) -> Result<TransitionRecord, RepositoryError> {
    Ok(TransitionRecord {
        order_id: row.try_get("order_id")?,
        from: row.try_get::<String, _>("from_status")?.parse()?,
        to: row.try_get::<String, _>("to_status")?.parse()?,
        requested: row.try_get::<String, _>("requested_status")?.parse()?,
        actor_id: row.try_get("actor_id")?,
        actor_role: row.try_get("actor_role")?,
        created_at: row.try_get("created_at")?,
    })
}

fn validation_from_row(row: &PgRow) -> Result<WalletValidationRecord, RepositoryError> {
    Ok(WalletValidationRecord {
        order_id: row.try_get("order_id")?,
        validated_by: row.try_get("validated_by")?,
        validation_status: row.try_get::<String, _>("validation_status")?.parse()?,
        validation_notes: row.try_get("validation_notes")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Group rows by their `order_id` column, keeping query order
fn group_by_order<T>(
    rows: &[PgRow],
    map: fn(&PgRow) -> Result<T, RepositoryError>,
) -> Result<HashMap<Uuid, Vec<T>>, RepositoryError> {
    let mut grouped: HashMap<Uuid, Vec<T>> = HashMap::new();
    for row in rows {
        let order_id: Uuid = row.try_get("order_id")?;
        grouped.entry(order_id).or_default().push(map(row)?);
    }
    Ok(grouped)
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn load_orders(&self) -> Result<Vec<OrderLedger>, RepositoryError> {
        let order_rows = sqlx::query(
            "SELECT id, order_number, status, payment_method, total_amount, validation_status, validation_notes, created_at, updated_at FROM orders ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        let item_rows = sqlx::query(
            "SELECT id, order_id, product_code, description, quantity FROM order_items ORDER BY order_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let verification_rows = sqlx::query(
            r#"
            SELECT v.order_id, v.order_item_id, v.required_scans, v.scanned_count, v.is_verified, v.last_scanned_at
            FROM packaging_item_verifications v
            JOIN order_items i ON i.id = v.order_item_id
            ORDER BY v.order_id, i.position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let session_rows = sqlx::query("SELECT order_id, sealed, started_at FROM packaging_sessions")
            .fetch_all(&self.pool)
            .await?;

        let transition_rows = sqlx::query(
            "SELECT order_id, from_status, to_status, requested_status, actor_id, actor_role, created_at FROM order_status_transitions ORDER BY order_id, seq",
        )
        .fetch_all(&self.pool)
        .await?;

        let validation_rows = sqlx::query(
            "SELECT order_id, validated_by, validation_status, validation_notes, created_at FROM wallet_validations ORDER BY order_id, seq",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut items = group_by_order(&item_rows, item_from_row)?;
        let mut verifications = group_by_order(&verification_rows, verification_from_row)?;
        let mut transitions = group_by_order(&transition_rows, transition_from_row)?;
        let mut validations = group_by_order(&validation_rows, validation_from_row)?;

        let mut sessions: HashMap<Uuid, SessionRow> = HashMap::new();
        for row in &session_rows {
            sessions.insert(
                row.try_get("order_id")?,
                SessionRow {
                    sealed: row.try_get("sealed")?,
                    started_at: row.try_get("started_at")?,
                },
            );
        }

        let mut ledgers = Vec::with_capacity(order_rows.len());
        for row in &order_rows {
            let order = order_from_row(row)?;
            let id = order.id;

            let packaging = match sessions.remove(&id) {
                Some(session) => PackagingSession::restore(
                    Some(verifications.remove(&id).unwrap_or_default()),
                    session.sealed,
                    session.started_at,
                ),
                None => PackagingSession::new(),
            };

            ledgers.push(OrderLedger::restore(
                order,
                items.remove(&id).unwrap_or_default(),
                packaging,
                transitions.remove(&id).unwrap_or_default(),
                validations.remove(&id).unwrap_or_default(),
            ));
        }

        tracing::debug!("Loaded {} order ledgers from Postgres", ledgers.len());
        Ok(ledgers)
    }

    async fn save_order(&self, ledger: &OrderLedger) -> Result<(), RepositoryError> {
        let order = &ledger.order;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, status, payment_method, total_amount, validation_status, validation_notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                validation_status = EXCLUDED.validation_status,
                validation_notes = EXCLUDED.validation_notes,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.total_amount)
        .bind(order.validation_status.as_str())
        .bind(&order.validation_notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in ledger.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_code, description, quantity, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(&item.product_code)
            .bind(&item.description)
            .bind(i32::try_from(item.quantity)?)
            .bind(i32::try_from(position)?)
            .execute(&mut *tx)
            .await?;
        }

        let packaging = ledger.packaging();
        if packaging.is_initialized() {
            sqlx::query(
                r#"
                INSERT INTO packaging_sessions (order_id, sealed, started_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (order_id) DO UPDATE SET sealed = EXCLUDED.sealed
                "#,
            )
            .bind(order.id)
            .bind(packaging.is_sealed())
            .bind(packaging.started_at())
            .execute(&mut *tx)
            .await?;

            for verification in packaging.verifications() {
                sqlx::query(
                    r#"
                    INSERT INTO packaging_item_verifications (order_item_id, order_id, required_scans, scanned_count, is_verified, last_scanned_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (order_item_id) DO UPDATE SET
                        scanned_count = EXCLUDED.scanned_count,
                        is_verified = EXCLUDED.is_verified,
                        last_scanned_at = EXCLUDED.last_scanned_at
                    "#,
                )
                .bind(verification.order_item_id)
                .bind(order.id)
                .bind(i32::try_from(verification.required_scans)?)
                .bind(i32::try_from(verification.scanned_count)?)
                .bind(verification.is_verified)
                .bind(verification.last_scanned_at)
                .execute(&mut *tx)
                .await?;
            }
        }

        // Audit rows are keyed by position; rows already written stay untouched
        for (seq, record) in ledger.transitions().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_status_transitions (order_id, seq, from_status, to_status, requested_status, actor_id, actor_role, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (order_id, seq) DO NOTHING
                "#,
            )
            .bind(order.id)
            .bind(i32::try_from(seq)?)
            .bind(record.from.as_str())
            .bind(record.to.as_str())
            .bind(record.requested.as_str())
            .bind(&record.actor_id)
            .bind(&record.actor_role)
            .bind(record.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for (seq, record) in ledger.validations().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO wallet_validations (order_id, seq, validated_by, validation_status, validation_notes, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (order_id, seq) DO NOTHING
                "#,
            )
            .bind(order.id)
            .bind(i32::try_from(seq)?)
            .bind(&record.validated_by)
            .bind(record.validation_status.as_str())
            .bind(&record.validation_notes)
            .bind(record.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
