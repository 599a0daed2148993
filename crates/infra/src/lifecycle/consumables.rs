//! Consumable stock: grants, returns and administration.
//!
//! The consumable row is read under lock before its quantity is checked, so
//! two grants racing for the last items serialize and the second one sees
//! the debited quantity.

use tracing::{info, instrument};

use stockroom_assets::{
    Action, Consumable, ConsumableAssignment, ConsumableAssignmentId, ConsumableId, ConsumablePatch,
    NewConsumable, StockRequest, UserId,
};
use stockroom_core::Entity;

use super::{LifecycleManager, LifecycleResult, fetch, persist, remove, traced};
use crate::store::{ActivitySink, AssignmentQueries, InventoryStore, Repository, StoreTx};

impl<S: InventoryStore> LifecycleManager<S> {
    #[instrument(skip_all, fields(name = %draft.name))]
    pub async fn create_consumable(
        &self,
        draft: NewConsumable,
        actor: Option<UserId>,
    ) -> LifecycleResult<Consumable> {
        let result: LifecycleResult<Consumable> = async {
            draft.validate()?;
            let mut tx = self.store.begin().await?;
            let consumable = Repository::<Consumable>::insert(&mut tx, draft).await?;
            tx.append(
                self.activity(Action::Create, consumable.id)
                    .by(actor)
                    .noting(format!(
                        "created consumable {} ({} on hand)",
                        consumable.name, consumable.quantity
                    )),
            )
            .await?;
            tx.commit().await?;
            Ok(consumable)
        }
        .await;
        traced("create_consumable", result)
    }

    /// Administrative edit. Setting `quantity` here is a stock count
    /// correction, independent of outstanding assignments.
    #[instrument(skip(self, patch, actor))]
    pub async fn update_consumable(
        &self,
        consumable_id: ConsumableId,
        patch: ConsumablePatch,
        actor: Option<UserId>,
    ) -> LifecycleResult<Consumable> {
        let result: LifecycleResult<Consumable> = async {
            let mut tx = self.store.begin().await?;
            let consumable: Consumable = fetch(&mut tx, consumable_id).await?;
            let consumable = persist(&mut tx, consumable.revise(patch)?).await?;
            tx.append(
                self.activity(Action::Update, consumable.id)
                    .by(actor)
                    .noting(format!("updated consumable {}", consumable.name)),
            )
            .await?;
            tx.commit().await?;
            Ok(consumable)
        }
        .await;
        traced("update_consumable", result)
    }

    /// Refused while any stock assignment is outstanding. Returned
    /// assignment rows are removed together with the consumable.
    #[instrument(skip(self, actor), fields(consumable_id = %consumable_id))]
    pub async fn delete_consumable(
        &self,
        consumable_id: ConsumableId,
        actor: Option<UserId>,
    ) -> LifecycleResult<()> {
        let result: LifecycleResult<()> = async {
            let mut tx = self.store.begin().await?;
            let consumable: Consumable = fetch(&mut tx, consumable_id).await?;
            let grants = tx.consumable_assignments(consumable_id).await?;
            let outstanding = grants.iter().filter(|g| g.status.is_active()).count();
            consumable.ensure_deletable(outstanding)?;

            tx.delete_consumable_assignments(consumable_id).await?;
            remove(&mut tx, consumable_id).await?;
            tx.append(
                self.activity(Action::Delete, consumable_id)
                    .by(actor)
                    .noting(format!("deleted consumable {}", consumable.name)),
            )
            .await?;
            tx.commit().await?;
            Ok(())
        }
        .await;
        traced("delete_consumable", result)
    }

    /// Debit `request.quantity` from stock and record who received it.
    /// Nothing is written when stock is short.
    #[instrument(
        skip(self, request, actor),
        fields(
            consumable_id = %consumable_id,
            quantity = %request.quantity,
            assignee = %request.assignee
        )
    )]
    pub async fn assign_stock(
        &self,
        consumable_id: ConsumableId,
        request: StockRequest,
        actor: Option<UserId>,
    ) -> LifecycleResult<ConsumableAssignment> {
        let result: LifecycleResult<ConsumableAssignment> = async {
            let mut tx = self.store.begin().await?;
            let consumable: Consumable = fetch(&mut tx, consumable_id).await?;
            let (patch, draft) = consumable.grant(request, self.clock.today())?;

            let mut next = consumable;
            next.apply_patch(patch);
            let consumable = persist(&mut tx, next).await?;
            let grant = Repository::<ConsumableAssignment>::insert(&mut tx, draft).await?;

            tx.append(
                self.activity(Action::Checkout, consumable.id)
                    .by(actor)
                    .noting(format!(
                        "{} of {} assigned to {}",
                        grant.quantity, consumable.name, grant.assignee
                    )),
            )
            .await?;
            tx.commit().await?;
            info!(
                consumable_id = %consumable.id,
                quantity = %grant.quantity,
                remaining = %consumable.quantity,
                "stock assigned"
            );
            Ok(grant)
        }
        .await;
        traced("assign_stock", result)
    }

    /// Mark a grant returned and credit back exactly the quantity it debited.
    #[instrument(skip(self, actor), fields(assignment_id = %assignment_id))]
    pub async fn return_stock(
        &self,
        assignment_id: ConsumableAssignmentId,
        actor: Option<UserId>,
    ) -> LifecycleResult<ConsumableAssignment> {
        let result: LifecycleResult<ConsumableAssignment> = async {
            let mut tx = self.store.begin().await?;
            let grant: ConsumableAssignment = fetch(&mut tx, assignment_id).await?;
            let grant_patch = grant.mark_returned(self.clock.today())?;
            let consumable: Consumable = fetch(&mut tx, grant.consumable_id).await?;
            let stock_patch = consumable.restock(grant.quantity)?;

            let mut next_grant = grant;
            next_grant.apply_patch(grant_patch);
            let grant = persist(&mut tx, next_grant).await?;
            let mut next_stock = consumable;
            next_stock.apply_patch(stock_patch);
            let consumable = persist(&mut tx, next_stock).await?;

            tx.append(
                self.activity(Action::Update, consumable.id)
                    .by(actor)
                    .noting(format!(
                        "{} of {} returned by {}",
                        grant.quantity, consumable.name, grant.assignee
                    )),
            )
            .await?;
            tx.commit().await?;
            info!(
                consumable_id = %consumable.id,
                quantity = %grant.quantity,
                remaining = %consumable.quantity,
                "stock returned"
            );
            Ok(grant)
        }
        .await;
        traced("return_stock", result)
    }

    /// Every stock assignment of the consumable, oldest first.
    #[instrument(skip(self))]
    pub async fn list_stock_assignments(
        &self,
        consumable_id: ConsumableId,
    ) -> LifecycleResult<Vec<ConsumableAssignment>> {
        let result: LifecycleResult<Vec<ConsumableAssignment>> = async {
            let mut tx = self.store.begin().await?;
            let _: Consumable = fetch(&mut tx, consumable_id).await?;
            Ok(tx.consumable_assignments(consumable_id).await?)
        }
        .await;
        traced("list_stock_assignments", result)
    }
}
