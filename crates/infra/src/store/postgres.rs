//! Postgres-backed inventory store.
//!
//! Each [`PgTx`] wraps one database transaction. Locked reads use
//! `SELECT ... FOR UPDATE`, so two lifecycle operations on the same record
//! queue behind each other instead of racing.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Constraint` | Duplicate unit tag or username |
//! | Database (foreign key violation) | `23503` | `Constraint` | Deleting a referenced user, unknown holder |
//! | Database (check constraint violation) | `23514` | `Constraint` | Negative stock, holder without custody status |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / ColumnDecode / other | N/A | `Backend` | Network, pool and decoding failures |
//!
//! Enum columns are stored as lowercase TEXT and quantities as BIGINT.

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgConnection, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use stockroom_assets::{
    Accessory, Activity, ActivityFilter, Component, Consumable, ConsumableAssignment, ConsumableId,
    ItemRef, License, LicenseAssignment, LicenseId, NewActivity, PermissionSet, PurchaseInfo, Unit,
    User, VirtualMachine,
};
use stockroom_core::{DomainError, Entity, Id, Quantity};

use super::{ActivitySink, AssignmentQueries, InventoryStore, Repository, StoreError, StoreTx};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Postgres-backed inventory store. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create any missing tables. Existing tables are left untouched.
    #[instrument(skip(self), err)]
    pub async fn bootstrap(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("bootstrap", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PgTx { tx: Some(tx) })
    }
}

/// One open database transaction. Rolled back on drop unless committed.
pub struct PgTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTx {
    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        self.tx.as_deref_mut().ok_or(StoreError::TransactionClosed)
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Generic table access
// ─────────────────────────────────────────────────────────────────────────────

/// Row mapping for one entity table. Every table has a BIGSERIAL `id`
/// followed by `COLUMNS` in bind order.
pub trait PgTable: Entity {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error>;

    /// Bind every column of `COLUMNS`, in order.
    fn bind_columns<'q>(self, query: PgQuery<'q>) -> PgQuery<'q>;
}

fn column_list(columns: &[&str]) -> String {
    let mut list = String::from("id");
    for column in columns {
        list.push_str(", ");
        list.push_str(column);
    }
    list
}

fn select_sql(table: &str, columns: &[&str]) -> String {
    format!("SELECT {} FROM {table}", column_list(columns))
}

fn insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|n| format!("${n}")).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({}) RETURNING {}",
        columns.join(", "),
        placeholders.join(", "),
        column_list(columns)
    )
}

fn update_sql(table: &str, columns: &[&str]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ${}", i + 1))
        .collect();
    format!(
        "UPDATE {table} SET {} WHERE id = ${} RETURNING {}",
        assignments.join(", "),
        columns.len() + 1,
        column_list(columns)
    )
}

#[async_trait]
impl<E: PgTable> Repository<E> for PgTx {
    #[instrument(level = "debug", skip(self), fields(table = E::TABLE), err)]
    async fn get(&mut self, id: Id<E>) -> Result<Option<E>, StoreError> {
        let sql = format!("{} WHERE id = $1 FOR UPDATE", select_sql(E::TABLE, E::COLUMNS));
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(self.conn()?)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;
        row.map(|row| E::from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error("get", e))
    }

    #[instrument(level = "debug", skip(self), fields(table = E::TABLE), err)]
    async fn list(&mut self) -> Result<Vec<E>, StoreError> {
        let sql = format!("{} ORDER BY id ASC", select_sql(E::TABLE, E::COLUMNS));
        let rows = sqlx::query(&sql)
            .fetch_all(self.conn()?)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;
        decode_rows(&rows, "list")
    }

    #[instrument(level = "debug", skip_all, fields(table = E::TABLE), err)]
    async fn insert(&mut self, draft: E::Draft) -> Result<E, StoreError> {
        let sql = insert_sql(E::TABLE, E::COLUMNS);
        // Placeholder id; the database assigns the real one.
        let record = E::from_draft(Id::new(0), draft);
        let row = record
            .bind_columns(sqlx::query(&sql))
            .fetch_one(self.conn()?)
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;
        E::from_row(&row).map_err(|e| map_sqlx_error("insert", e))
    }

    #[instrument(level = "debug", skip_all, fields(table = E::TABLE, id = %record.id()), err)]
    async fn replace(&mut self, record: E) -> Result<Option<E>, StoreError> {
        let sql = update_sql(E::TABLE, E::COLUMNS);
        let id = record.id();
        let row = record
            .bind_columns(sqlx::query(&sql))
            .bind(id.get())
            .fetch_optional(self.conn()?)
            .await
            .map_err(|e| map_sqlx_error("replace", e))?;
        row.map(|row| E::from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error("replace", e))
    }

    #[instrument(level = "debug", skip(self), fields(table = E::TABLE), err)]
    async fn delete(&mut self, id: Id<E>) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(id.get())
            .execute(self.conn()?)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        Ok(result.rows_affected() > 0)
    }
}

fn decode_rows<E: PgTable>(rows: &[PgRow], operation: &str) -> Result<Vec<E>, StoreError> {
    rows.iter()
        .map(|row| E::from_row(row).map_err(|e| map_sqlx_error(operation, e)))
        .collect()
}

#[async_trait]
impl AssignmentQueries for PgTx {
    async fn license_assignments(
        &mut self,
        license: LicenseId,
    ) -> Result<Vec<LicenseAssignment>, StoreError> {
        let sql = format!(
            "{} WHERE license_id = $1 ORDER BY assigned_date ASC, id ASC",
            select_sql(LicenseAssignment::TABLE, LicenseAssignment::COLUMNS)
        );
        let rows = sqlx::query(&sql)
            .bind(license.get())
            .fetch_all(self.conn()?)
            .await
            .map_err(|e| map_sqlx_error("license_assignments", e))?;
        decode_rows(&rows, "license_assignments")
    }

    async fn delete_license_assignments(&mut self, license: LicenseId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM license_assignments WHERE license_id = $1")
            .bind(license.get())
            .execute(self.conn()?)
            .await
            .map_err(|e| map_sqlx_error("delete_license_assignments", e))?;
        Ok(result.rows_affected())
    }

    async fn consumable_assignments(
        &mut self,
        consumable: ConsumableId,
    ) -> Result<Vec<ConsumableAssignment>, StoreError> {
        let sql = format!(
            "{} WHERE consumable_id = $1 ORDER BY assigned_date ASC, id ASC",
            select_sql(ConsumableAssignment::TABLE, ConsumableAssignment::COLUMNS)
        );
        let rows = sqlx::query(&sql)
            .bind(consumable.get())
            .fetch_all(self.conn()?)
            .await
            .map_err(|e| map_sqlx_error("consumable_assignments", e))?;
        decode_rows(&rows, "consumable_assignments")
    }

    async fn delete_consumable_assignments(
        &mut self,
        consumable: ConsumableId,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM consumable_assignments WHERE consumable_id = $1")
            .bind(consumable.get())
            .execute(self.conn()?)
            .await
            .map_err(|e| map_sqlx_error("delete_consumable_assignments", e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ActivitySink for PgTx {
    #[instrument(
        level = "debug",
        skip_all,
        fields(action = %activity.action, item_type = %activity.item.item_type),
        err
    )]
    async fn append(&mut self, activity: NewActivity) -> Result<Activity, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO activities (action, item_type, item_id, user_id, occurred_at, notes)
            VALUES ($1, $2, $3, $4, COALESCE($5, now()), $6)
            RETURNING id, action, item_type, item_id, user_id, occurred_at, notes
            "#,
        )
        .bind(activity.action.as_str())
        .bind(activity.item.item_type.as_str())
        .bind(activity.item.item_id)
        .bind(activity.user_id.map(Id::get))
        .bind(activity.timestamp)
        .bind(activity.notes)
        .fetch_one(self.conn()?)
        .await
        .map_err(|e| map_sqlx_error("append_activity", e))?;
        activity_from_row(&row).map_err(|e| map_sqlx_error("append_activity", e))
    }

    async fn activities(&mut self, filter: ActivityFilter) -> Result<Vec<Activity>, StoreError> {
        let (user_id, item_type, item_id) = filter_params(filter);
        let rows = sqlx::query(
            r#"
            SELECT id, action, item_type, item_id, user_id, occurred_at, notes
            FROM activities
            WHERE ($1::bigint IS NULL OR user_id = $1)
                AND ($2::text IS NULL OR (item_type = $2 AND item_id = $3))
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(item_type)
        .bind(item_id)
        .fetch_all(self.conn()?)
        .await
        .map_err(|e| map_sqlx_error("list_activities", e))?;
        rows.iter()
            .map(|row| activity_from_row(row).map_err(|e| map_sqlx_error("list_activities", e)))
            .collect()
    }
}

/// Bind values for the activity query: `(user_id, item_type, item_id)`.
fn filter_params(filter: ActivityFilter) -> (Option<i64>, Option<&'static str>, Option<i64>) {
    match filter {
        ActivityFilter::All => (None, None, None),
        ActivityFilter::ByUser(user) => (Some(user.get()), None, None),
        ActivityFilter::ByItem(item) => (None, Some(item.item_type.as_str()), Some(item.item_id)),
    }
}

fn activity_from_row(row: &PgRow) -> Result<Activity, sqlx::Error> {
    Ok(Activity {
        id: Id::new(row.try_get("id")?),
        action: parse_column(row, "action")?,
        item: ItemRef {
            item_type: parse_column(row, "item_type")?,
            item_id: row.try_get("item_id")?,
        },
        user_id: row.try_get::<Option<i64>, _>("user_id")?.map(Id::new),
        timestamp: row.try_get("occurred_at")?,
        notes: row.try_get("notes")?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Column codecs
// ─────────────────────────────────────────────────────────────────────────────

fn decode_error(column: &str, source: DomainError) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

/// Decode a TEXT column through the type's `FromStr`.
fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr<Err = DomainError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e| decode_error(column, e))
}

fn quantity_column(row: &PgRow, column: &str) -> Result<Quantity, sqlx::Error> {
    let raw: i64 = row.try_get(column)?;
    Quantity::try_from(raw).map_err(|e| decode_error(column, e))
}

/// Seat, CPU and size counts: BIGINT in the table, `u32` in the record.
fn count_column(row: &PgRow, column: &str) -> Result<u32, sqlx::Error> {
    let raw: i64 = row.try_get(column)?;
    u32::try_from(raw).map_err(|_| {
        decode_error(column, DomainError::validation(format!("{column} {raw} out of range")))
    })
}

const PURCHASE_COLUMNS: [&str; 4] =
    ["purchase_date", "purchase_cost_cents", "order_number", "supplier"];

fn purchase_from_row(row: &PgRow) -> Result<PurchaseInfo, sqlx::Error> {
    Ok(PurchaseInfo {
        purchase_date: row.try_get("purchase_date")?,
        purchase_cost_cents: row.try_get("purchase_cost_cents")?,
        order_number: row.try_get("order_number")?,
        supplier: row.try_get("supplier")?,
    })
}

fn bind_purchase<'q>(query: PgQuery<'q>, purchase: PurchaseInfo) -> PgQuery<'q> {
    query
        .bind(purchase.purchase_date)
        .bind(purchase.purchase_cost_cents)
        .bind(purchase.order_number)
        .bind(purchase.supplier)
}

// ─────────────────────────────────────────────────────────────────────────────
// Table mappings
// ─────────────────────────────────────────────────────────────────────────────

impl PgTable for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "username",
        "first_name",
        "last_name",
        "email",
        "department",
        "is_admin",
        "permissions",
    ];

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(User {
            id: Id::new(row.try_get("id")?),
            username: row.try_get("username")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            department: row.try_get("department")?,
            is_admin: row.try_get("is_admin")?,
            permissions: row.try_get::<Json<PermissionSet>, _>("permissions")?.0,
        })
    }

    fn bind_columns<'q>(self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.username)
            .bind(self.first_name)
            .bind(self.last_name)
            .bind(self.email)
            .bind(self.department)
            .bind(self.is_admin)
            .bind(Json(self.permissions))
    }
}

impl PgTable for Unit {
    const TABLE: &'static str = "units";
    const COLUMNS: &'static [&'static str] = &[
        "tag",
        "name",
        "category",
        "serial",
        "status",
        "holder_id",
        "checkout_date",
        "expected_return_date",
        "external_id",
        "location",
        "notes",
        PURCHASE_COLUMNS[0],
        PURCHASE_COLUMNS[1],
        PURCHASE_COLUMNS[2],
        PURCHASE_COLUMNS[3],
    ];

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Unit {
            id: Id::new(row.try_get("id")?),
            tag: row.try_get("tag")?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            serial: row.try_get("serial")?,
            status: parse_column(row, "status")?,
            holder: row.try_get::<Option<i64>, _>("holder_id")?.map(Id::new),
            checkout_date: row.try_get("checkout_date")?,
            expected_return_date: row.try_get("expected_return_date")?,
            external_id: row.try_get("external_id")?,
            location: row.try_get("location")?,
            notes: row.try_get("notes")?,
            purchase: purchase_from_row(row)?,
        })
    }

    fn bind_columns<'q>(self, query: PgQuery<'q>) -> PgQuery<'q> {
        let query = query
            .bind(self.tag)
            .bind(self.name)
            .bind(self.category)
            .bind(self.serial)
            .bind(self.status.as_str())
            .bind(self.holder.map(Id::get))
            .bind(self.checkout_date)
            .bind(self.expected_return_date)
            .bind(self.external_id)
            .bind(self.location)
            .bind(self.notes);
        bind_purchase(query, self.purchase)
    }
}

impl PgTable for License {
    const TABLE: &'static str = "licenses";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "product_key",
        "seats",
        "licensed_to",
        "license_email",
        "reassignable",
        "expiry_date",
        "notes",
        PURCHASE_COLUMNS[0],
        PURCHASE_COLUMNS[1],
        PURCHASE_COLUMNS[2],
        PURCHASE_COLUMNS[3],
    ];

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(License {
            id: Id::new(row.try_get("id")?),
            name: row.try_get("name")?,
            product_key: row.try_get("product_key")?,
            seats: count_column(row, "seats")?,
            licensed_to: row.try_get("licensed_to")?,
            license_email: row.try_get("license_email")?,
            reassignable: row.try_get("reassignable")?,
            expiry_date: row.try_get("expiry_date")?,
            notes: row.try_get("notes")?,
            purchase: purchase_from_row(row)?,
        })
    }

    fn bind_columns<'q>(self, query: PgQuery<'q>) -> PgQuery<'q> {
        let query = query
            .bind(self.name)
            .bind(self.product_key)
            .bind(i64::from(self.seats))
            .bind(self.licensed_to)
            .bind(self.license_email)
            .bind(self.reassignable)
            .bind(self.expiry_date)
            .bind(self.notes);
        bind_purchase(query, self.purchase)
    }
}

impl PgTable for LicenseAssignment {
    const TABLE: &'static str = "license_assignments";
    const COLUMNS: &'static [&'static str] = &[
        "license_id",
        "assignee",
        "serial",
        "notes",
        "assigned_date",
        "returned_date",
        "status",
    ];

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(LicenseAssignment {
            id: Id::new(row.try_get("id")?),
            license_id: Id::new(row.try_get("license_id")?),
            assignee: row.try_get("assignee")?,
            serial: row.try_get("serial")?,
            notes: row.try_get("notes")?,
            assigned_date: row.try_get("assigned_date")?,
            returned_date: row.try_get("returned_date")?,
            status: parse_column(row, "status")?,
        })
    }

    fn bind_columns<'q>(self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.license_id.get())
            .bind(self.assignee)
            .bind(self.serial)
            .bind(self.notes)
            .bind(self.assigned_date)
            .bind(self.returned_date)
            .bind(self.status.as_str())
    }
}

impl PgTable for Consumable {
    const TABLE: &'static str = "consumables";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "category",
        "item_no",
        "quantity",
        "min_quantity",
        "location",
        "notes",
        PURCHASE_COLUMNS[0],
        PURCHASE_COLUMNS[1],
        PURCHASE_COLUMNS[2],
        PURCHASE_COLUMNS[3],
    ];

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Consumable {
            id: Id::new(row.try_get("id")?),
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            item_no: row.try_get("item_no")?,
            quantity: quantity_column(row, "quantity")?,
            min_quantity: quantity_column(row, "min_quantity")?,
            location: row.try_get("location")?,
            notes: row.try_get("notes")?,
            purchase: purchase_from_row(row)?,
        })
    }

    fn bind_columns<'q>(self, query: PgQuery<'q>) -> PgQuery<'q> {
        let query = query
            .bind(self.name)
            .bind(self.category)
            .bind(self.item_no)
            .bind(i64::from(self.quantity))
            .bind(i64::from(self.min_quantity))
            .bind(self.location)
            .bind(self.notes);
        bind_purchase(query, self.purchase)
    }
}

impl PgTable for ConsumableAssignment {
    const TABLE: &'static str = "consumable_assignments";
    const COLUMNS: &'static [&'static str] = &[
        "consumable_id",
        "assignee",
        "serial",
        "external_id",
        "quantity",
        "assigned_date",
        "returned_date",
        "status",
        "notes",
    ];

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(ConsumableAssignment {
            id: Id::new(row.try_get("id")?),
            consumable_id: Id::new(row.try_get("consumable_id")?),
            assignee: row.try_get("assignee")?,
            serial: row.try_get("serial")?,
            external_id: row.try_get("external_id")?,
            quantity: quantity_column(row, "quantity")?,
            assigned_date: row.try_get("assigned_date")?,
            returned_date: row.try_get("returned_date")?,
            status: parse_column(row, "status")?,
            notes: row.try_get("notes")?,
        })
    }

    fn bind_columns<'q>(self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.consumable_id.get())
            .bind(self.assignee)
            .bind(self.serial)
            .bind(self.external_id)
            .bind(i64::from(self.quantity))
            .bind(self.assigned_date)
            .bind(self.returned_date)
            .bind(self.status.as_str())
            .bind(self.notes)
    }
}

impl PgTable for Component {
    const TABLE: &'static str = "components";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "category",
        "serial",
        "quantity",
        "min_quantity",
        "location",
        "notes",
        "manufacturer",
        PURCHASE_COLUMNS[0],
        PURCHASE_COLUMNS[1],
        PURCHASE_COLUMNS[2],
        PURCHASE_COLUMNS[3],
    ];

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Component {
            id: Id::new(row.try_get("id")?),
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            serial: row.try_get("serial")?,
            quantity: quantity_column(row, "quantity")?,
            min_quantity: quantity_column(row, "min_quantity")?,
            location: row.try_get("location")?,
            notes: row.try_get("notes")?,
            manufacturer: row.try_get("manufacturer")?,
            purchase: purchase_from_row(row)?,
        })
    }

    fn bind_columns<'q>(self, query: PgQuery<'q>) -> PgQuery<'q> {
        let query = query
            .bind(self.name)
            .bind(self.category)
            .bind(self.serial)
            .bind(i64::from(self.quantity))
            .bind(i64::from(self.min_quantity))
            .bind(self.location)
            .bind(self.notes)
            .bind(self.manufacturer);
        bind_purchase(query, self.purchase)
    }
}

impl PgTable for Accessory {
    const TABLE: &'static str = "accessories";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "accessory_type",
        "serial",
        "quantity",
        "min_quantity",
        "location",
        "notes",
        "manufacturer",
        PURCHASE_COLUMNS[0],
        PURCHASE_COLUMNS[1],
        PURCHASE_COLUMNS[2],
        PURCHASE_COLUMNS[3],
    ];

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Accessory {
            id: Id::new(row.try_get("id")?),
            name: row.try_get("name")?,
            accessory_type: row.try_get("accessory_type")?,
            serial: row.try_get("serial")?,
            quantity: quantity_column(row, "quantity")?,
            min_quantity: quantity_column(row, "min_quantity")?,
            location: row.try_get("location")?,
            notes: row.try_get("notes")?,
            manufacturer: row.try_get("manufacturer")?,
            purchase: purchase_from_row(row)?,
        })
    }

    fn bind_columns<'q>(self, query: PgQuery<'q>) -> PgQuery<'q> {
        let query = query
            .bind(self.name)
            .bind(self.accessory_type)
            .bind(self.serial)
            .bind(i64::from(self.quantity))
            .bind(i64::from(self.min_quantity))
            .bind(self.location)
            .bind(self.notes)
            .bind(self.manufacturer);
        bind_purchase(query, self.purchase)
    }
}

impl PgTable for VirtualMachine {
    const TABLE: &'static str = "vms";
    const COLUMNS: &'static [&'static str] = &[
        "vm_name",
        "host_name",
        "guest_os",
        "power_state",
        "cpu_count",
        "memory_mb",
        "disk_gb",
        "ip_address",
        "mac_address",
        "tools_status",
        "cluster",
        "datastore",
        "notes",
    ];

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(VirtualMachine {
            id: Id::new(row.try_get("id")?),
            vm_name: row.try_get("vm_name")?,
            host_name: row.try_get("host_name")?,
            guest_os: row.try_get("guest_os")?,
            power_state: parse_column(row, "power_state")?,
            cpu_count: count_column(row, "cpu_count")?,
            memory_mb: count_column(row, "memory_mb")?,
            disk_gb: count_column(row, "disk_gb")?,
            ip_address: row.try_get("ip_address")?,
            mac_address: row.try_get("mac_address")?,
            tools_status: row.try_get("tools_status")?,
            cluster: row.try_get("cluster")?,
            datastore: row.try_get("datastore")?,
            notes: row.try_get("notes")?,
        })
    }

    fn bind_columns<'q>(self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.vm_name)
            .bind(self.host_name)
            .bind(self.guest_os)
            .bind(self.power_state.as_str())
            .bind(i64::from(self.cpu_count))
            .bind(i64::from(self.memory_mb))
            .bind(i64::from(self.disk_gb))
            .bind(self.ip_address)
            .bind(self.mac_address)
            .bind(self.tools_status)
            .bind(self.cluster)
            .bind(self.datastore)
            .bind(self.notes)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────────────────────────────────────

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL,
        department TEXT,
        is_admin BOOLEAN NOT NULL DEFAULT FALSE,
        permissions JSONB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS units (
        id BIGSERIAL PRIMARY KEY,
        tag TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        category TEXT,
        serial TEXT,
        status TEXT NOT NULL,
        holder_id BIGINT REFERENCES users (id),
        checkout_date DATE,
        expected_return_date DATE,
        external_id TEXT,
        location TEXT,
        notes TEXT,
        purchase_date DATE,
        purchase_cost_cents BIGINT,
        order_number TEXT,
        supplier TEXT,
        CHECK ((status IN ('deployed', 'overdue')) = (holder_id IS NOT NULL))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS licenses (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        product_key TEXT,
        seats BIGINT NOT NULL CHECK (seats >= 0),
        licensed_to TEXT,
        license_email TEXT,
        reassignable BOOLEAN NOT NULL DEFAULT TRUE,
        expiry_date DATE,
        notes TEXT,
        purchase_date DATE,
        purchase_cost_cents BIGINT,
        order_number TEXT,
        supplier TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS license_assignments (
        id BIGSERIAL PRIMARY KEY,
        license_id BIGINT NOT NULL REFERENCES licenses (id),
        assignee TEXT NOT NULL,
        serial TEXT,
        notes TEXT,
        assigned_date DATE NOT NULL,
        returned_date DATE,
        status TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS consumables (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        category TEXT,
        item_no TEXT,
        quantity BIGINT NOT NULL CHECK (quantity >= 0),
        min_quantity BIGINT NOT NULL CHECK (min_quantity >= 0),
        location TEXT,
        notes TEXT,
        purchase_date DATE,
        purchase_cost_cents BIGINT,
        order_number TEXT,
        supplier TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS consumable_assignments (
        id BIGSERIAL PRIMARY KEY,
        consumable_id BIGINT NOT NULL REFERENCES consumables (id),
        assignee TEXT NOT NULL,
        serial TEXT,
        external_id TEXT,
        quantity BIGINT NOT NULL CHECK (quantity > 0),
        assigned_date DATE NOT NULL,
        returned_date DATE,
        status TEXT NOT NULL,
        notes TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS components (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        category TEXT,
        serial TEXT,
        quantity BIGINT NOT NULL CHECK (quantity >= 0),
        min_quantity BIGINT NOT NULL CHECK (min_quantity >= 0),
        location TEXT,
        notes TEXT,
        manufacturer TEXT,
        purchase_date DATE,
        purchase_cost_cents BIGINT,
        order_number TEXT,
        supplier TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS accessories (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        accessory_type TEXT,
        serial TEXT,
        quantity BIGINT NOT NULL CHECK (quantity >= 0),
        min_quantity BIGINT NOT NULL CHECK (min_quantity >= 0),
        location TEXT,
        notes TEXT,
        manufacturer TEXT,
        purchase_date DATE,
        purchase_cost_cents BIGINT,
        order_number TEXT,
        supplier TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vms (
        id BIGSERIAL PRIMARY KEY,
        vm_name TEXT NOT NULL,
        host_name TEXT NOT NULL,
        guest_os TEXT NOT NULL,
        power_state TEXT NOT NULL,
        cpu_count BIGINT NOT NULL CHECK (cpu_count > 0),
        memory_mb BIGINT NOT NULL CHECK (memory_mb > 0),
        disk_gb BIGINT NOT NULL CHECK (disk_gb >= 0),
        ip_address TEXT,
        mac_address TEXT,
        tools_status TEXT,
        cluster TEXT,
        datastore TEXT,
        notes TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS activities (
        id BIGSERIAL PRIMARY KEY,
        action TEXT NOT NULL,
        item_type TEXT NOT NULL,
        item_id BIGINT NOT NULL,
        user_id BIGINT REFERENCES users (id),
        occurred_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        notes TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS activities_item_idx ON activities (item_type, item_id)",
    "CREATE INDEX IF NOT EXISTS activities_user_idx ON activities (user_id)",
];

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // unique, foreign key, check
                Some("23505" | "23503" | "23514") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_assets::ItemType;

    #[test]
    fn insert_sql_numbers_placeholders_in_column_order() {
        assert_eq!(
            insert_sql("things", &["a", "b"]),
            "INSERT INTO things (a, b) VALUES ($1, $2) RETURNING id, a, b"
        );
    }

    #[test]
    fn update_sql_binds_id_after_the_columns() {
        assert_eq!(
            update_sql("things", &["a", "b"]),
            "UPDATE things SET a = $1, b = $2 WHERE id = $3 RETURNING id, a, b"
        );
    }

    #[test]
    fn select_sql_leads_with_id() {
        assert_eq!(select_sql("things", &["a"]), "SELECT id, a FROM things");
    }

    #[test]
    fn every_table_mapping_has_a_schema_entry() {
        let tables = [
            User::TABLE,
            Unit::TABLE,
            License::TABLE,
            LicenseAssignment::TABLE,
            Consumable::TABLE,
            ConsumableAssignment::TABLE,
            Component::TABLE,
            Accessory::TABLE,
            VirtualMachine::TABLE,
        ];
        for table in tables {
            let ddl = format!("CREATE TABLE IF NOT EXISTS {table} (");
            assert!(SCHEMA.iter().any(|s| s.contains(&ddl)), "no schema for {table}");
        }
    }

    #[test]
    fn mapped_columns_exist_in_the_schema() {
        let mappings: [(&str, &[&str]); 9] = [
            (User::TABLE, User::COLUMNS),
            (Unit::TABLE, Unit::COLUMNS),
            (License::TABLE, License::COLUMNS),
            (LicenseAssignment::TABLE, LicenseAssignment::COLUMNS),
            (Consumable::TABLE, Consumable::COLUMNS),
            (ConsumableAssignment::TABLE, ConsumableAssignment::COLUMNS),
            (Component::TABLE, Component::COLUMNS),
            (Accessory::TABLE, Accessory::COLUMNS),
            (VirtualMachine::TABLE, VirtualMachine::COLUMNS),
        ];
        for (table, columns) in mappings {
            let header = format!("CREATE TABLE IF NOT EXISTS {table} (");
            let ddl = SCHEMA.iter().find(|s| s.contains(&header)).unwrap();
            for column in columns {
                assert!(ddl.contains(&format!("\n        {column} ")), "{table}.{column} missing");
            }
        }
    }

    #[test]
    fn activity_filter_binds() {
        assert_eq!(filter_params(ActivityFilter::All), (None, None, None));
        assert_eq!(filter_params(ActivityFilter::ByUser(Id::new(3))), (Some(3), None, None));
        let item = ItemRef {
            item_type: ItemType::License,
            item_id: 8,
        };
        assert_eq!(filter_params(ActivityFilter::ByItem(item)), (None, Some("license"), Some(8)));
    }
}
