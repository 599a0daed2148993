//! Unit custody: checkout / checkin, overdue flagging, archive, admin edits.

use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use stockroom_assets::{Action, NewUnit, Unit, UnitId, UnitPatch, User, UserId};
use stockroom_core::Entity;

use super::{LifecycleManager, LifecycleResult, fetch, persist, remove, traced};
use crate::store::{ActivitySink, InventoryStore, Repository, StoreTx};

impl<S: InventoryStore> LifecycleManager<S> {
    #[instrument(skip_all, fields(tag = %draft.tag))]
    pub async fn create_unit(
        &self,
        draft: NewUnit,
        actor: Option<UserId>,
    ) -> LifecycleResult<Unit> {
        let result: LifecycleResult<Unit> = async {
            draft.validate()?;
            let mut tx = self.store.begin().await?;
            let unit = Repository::<Unit>::insert(&mut tx, draft).await?;
            tx.append(
                self.activity(Action::Create, unit.id)
                    .by(actor)
                    .noting(format!("created unit {}", unit.tag)),
            )
            .await?;
            tx.commit().await?;
            Ok(unit)
        }
        .await;
        traced("create_unit", result)
    }

    /// Descriptive edits and the external id. Custody fields are refused.
    #[instrument(skip(self, patch, actor))]
    pub async fn update_unit(
        &self,
        unit_id: UnitId,
        patch: UnitPatch,
        actor: Option<UserId>,
    ) -> LifecycleResult<Unit> {
        let result: LifecycleResult<Unit> = async {
            let mut tx = self.store.begin().await?;
            let unit = fetch(&mut tx, unit_id).await?;
            let unit = persist(&mut tx, unit.revise(patch)?).await?;
            tx.append(
                self.activity(Action::Update, unit.id)
                    .by(actor)
                    .noting(format!("updated unit {}", unit.tag)),
            )
            .await?;
            tx.commit().await?;
            Ok(unit)
        }
        .await;
        traced("update_unit", result)
    }

    /// Refused while the unit is checked out.
    #[instrument(skip(self, actor))]
    pub async fn delete_unit(&self, unit_id: UnitId, actor: Option<UserId>) -> LifecycleResult<()> {
        let result: LifecycleResult<()> = async {
            let mut tx = self.store.begin().await?;
            let unit = fetch(&mut tx, unit_id).await?;
            unit.ensure_deletable()?;
            remove(&mut tx, unit_id).await?;
            tx.append(
                self.activity(Action::Delete, unit_id)
                    .by(actor)
                    .noting(format!("deleted unit {}", unit.tag)),
            )
            .await?;
            tx.commit().await?;
            Ok(())
        }
        .await;
        traced("delete_unit", result)
    }

    /// Hand an Available unit to `user_id`. The ledger row is attributed to
    /// the receiving user.
    #[instrument(skip(self, note), fields(unit_id = %unit_id, user_id = %user_id))]
    pub async fn checkout(
        &self,
        unit_id: UnitId,
        user_id: UserId,
        expected_return_date: Option<NaiveDate>,
        note: Option<String>,
    ) -> LifecycleResult<Unit> {
        let result: LifecycleResult<Unit> = async {
            let mut tx = self.store.begin().await?;
            let unit = fetch(&mut tx, unit_id).await?;
            let user: User = fetch(&mut tx, user_id).await?;
            let patch = unit.checkout(user.id, self.clock.today(), expected_return_date)?;

            let mut next = unit;
            next.apply_patch(patch);
            let unit = persist(&mut tx, next).await?;

            let note = note.unwrap_or_else(|| format!("checked out to {}", user.display_name()));
            tx.append(self.activity(Action::Checkout, unit.id).by(Some(user.id)).noting(note))
                .await?;
            tx.commit().await?;
            Ok(unit)
        }
        .await;
        if let Ok(unit) = &result {
            info!(unit_id = %unit.id, user_id = %user_id, "unit checked out");
        }
        traced("checkout", result)
    }

    /// Return a checked-out unit. A missing unit, or one that is not in
    /// custody, is reported as `Ok(None)` rather than an error.
    #[instrument(skip(self), fields(unit_id = %unit_id))]
    pub async fn checkin(&self, unit_id: UnitId) -> LifecycleResult<Option<Unit>> {
        let result: LifecycleResult<Option<Unit>> = async {
            let mut tx = self.store.begin().await?;
            let Some(unit) = Repository::<Unit>::get(&mut tx, unit_id).await? else {
                debug!("nothing to check in: unit not found");
                return Ok(None);
            };
            let patch = match unit.checkin() {
                Ok(patch) => patch,
                Err(reason) => {
                    debug!(%reason, "nothing to check in");
                    return Ok(None);
                }
            };

            let previous_holder = unit.holder;
            let mut next = unit;
            next.apply_patch(patch);
            let unit = persist(&mut tx, next).await?;

            tx.append(
                self.activity(Action::Checkin, unit.id)
                    .by(previous_holder)
                    .noting("checked in"),
            )
            .await?;
            tx.commit().await?;
            info!(unit_id = %unit.id, "unit checked in");
            Ok(Some(unit))
        }
        .await;
        traced("checkin", result)
    }

    #[instrument(skip(self, actor), fields(unit_id = %unit_id))]
    pub async fn mark_overdue(
        &self,
        unit_id: UnitId,
        actor: Option<UserId>,
    ) -> LifecycleResult<Unit> {
        let result: LifecycleResult<Unit> = async {
            let mut tx = self.store.begin().await?;
            let unit = fetch(&mut tx, unit_id).await?;
            let patch = unit.mark_overdue()?;
            let mut next = unit;
            next.apply_patch(patch);
            let unit = persist(&mut tx, next).await?;
            tx.append(self.activity(Action::Update, unit.id).by(actor).noting("marked overdue"))
                .await?;
            tx.commit().await?;
            Ok(unit)
        }
        .await;
        traced("mark_overdue", result)
    }

    /// Mark every Deployed unit past its expected-return date as Overdue, in
    /// one transaction. Returns the units that were flagged.
    #[instrument(skip(self))]
    pub async fn flag_overdue_units(&self) -> LifecycleResult<Vec<Unit>> {
        let result: LifecycleResult<Vec<Unit>> = async {
            let today = self.clock.today();
            let mut tx = self.store.begin().await?;
            let candidates: Vec<UnitId> = Repository::<Unit>::list(&mut tx)
                .await?
                .into_iter()
                .filter(|unit| unit.is_past_due(today))
                .map(|unit| unit.id)
                .collect();

            let mut flagged = Vec::with_capacity(candidates.len());
            for unit_id in candidates {
                // Re-read under lock; the unlocked listing may be stale.
                let unit = fetch(&mut tx, unit_id).await?;
                if !unit.is_past_due(today) {
                    continue;
                }
                let patch = unit.mark_overdue()?;
                let mut next = unit;
                next.apply_patch(patch);
                let unit = persist(&mut tx, next).await?;
                tx.append(self.activity(Action::Update, unit.id).noting("flagged overdue"))
                    .await?;
                flagged.push(unit);
            }
            tx.commit().await?;
            Ok(flagged)
        }
        .await;
        if let Ok(flagged) = &result {
            info!(count = flagged.len(), "overdue units flagged");
        }
        traced("flag_overdue_units", result)
    }

    #[instrument(skip(self, actor), fields(unit_id = %unit_id))]
    pub async fn archive_unit(
        &self,
        unit_id: UnitId,
        actor: Option<UserId>,
    ) -> LifecycleResult<Unit> {
        let result: LifecycleResult<Unit> = async {
            let mut tx = self.store.begin().await?;
            let unit = fetch(&mut tx, unit_id).await?;
            let patch = unit.archive()?;
            let mut next = unit;
            next.apply_patch(patch);
            let unit = persist(&mut tx, next).await?;
            tx.append(self.activity(Action::Update, unit.id).by(actor).noting("archived"))
                .await?;
            tx.commit().await?;
            Ok(unit)
        }
        .await;
        traced("archive_unit", result)
    }
}
