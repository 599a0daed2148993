//! Component and accessory stock. Plain records: create, edit, delete, each
//! with its ledger row.

use tracing::instrument;

use stockroom_assets::{
    Accessory, AccessoryId, AccessoryPatch, Action, Component, ComponentId, ComponentPatch,
    NewAccessory, NewComponent, UserId,
};

use super::{LifecycleManager, LifecycleResult, fetch, persist, remove, traced};
use crate::store::{ActivitySink, InventoryStore, Repository, StoreTx};

impl<S: InventoryStore> LifecycleManager<S> {
    #[instrument(skip_all, fields(name = %draft.name))]
    pub async fn create_component(
        &self,
        draft: NewComponent,
        actor: Option<UserId>,
    ) -> LifecycleResult<Component> {
        let result: LifecycleResult<Component> = async {
            draft.validate()?;
            let mut tx = self.store.begin().await?;
            let component = Repository::<Component>::insert(&mut tx, draft).await?;
            tx.append(
                self.activity(Action::Create, component.id)
                    .by(actor)
                    .noting(format!(
                        "created component {} ({} on hand)",
                        component.name, component.quantity
                    )),
            )
            .await?;
            tx.commit().await?;
            Ok(component)
        }
        .await;
        traced("create_component", result)
    }

    #[instrument(skip(self, patch, actor))]
    pub async fn update_component(
        &self,
        component_id: ComponentId,
        patch: ComponentPatch,
        actor: Option<UserId>,
    ) -> LifecycleResult<Component> {
        let result: LifecycleResult<Component> = async {
            let mut tx = self.store.begin().await?;
            let component: Component = fetch(&mut tx, component_id).await?;
            let component = persist(&mut tx, component.revise(patch)?).await?;
            tx.append(
                self.activity(Action::Update, component.id)
                    .by(actor)
                    .noting(format!("updated component {}", component.name)),
            )
            .await?;
            tx.commit().await?;
            Ok(component)
        }
        .await;
        traced("update_component", result)
    }

    #[instrument(skip(self, actor))]
    pub async fn delete_component(
        &self,
        component_id: ComponentId,
        actor: Option<UserId>,
    ) -> LifecycleResult<()> {
        let result: LifecycleResult<()> = async {
            let mut tx = self.store.begin().await?;
            let component: Component = fetch(&mut tx, component_id).await?;
            remove(&mut tx, component_id).await?;
            tx.append(
                self.activity(Action::Delete, component_id)
                    .by(actor)
                    .noting(format!("deleted component {}", component.name)),
            )
            .await?;
            tx.commit().await?;
            Ok(())
        }
        .await;
        traced("delete_component", result)
    }

    #[instrument(skip_all, fields(name = %draft.name))]
    pub async fn create_accessory(
        &self,
        draft: NewAccessory,
        actor: Option<UserId>,
    ) -> LifecycleResult<Accessory> {
        let result: LifecycleResult<Accessory> = async {
            draft.validate()?;
            let mut tx = self.store.begin().await?;
            let accessory = Repository::<Accessory>::insert(&mut tx, draft).await?;
            tx.append(
                self.activity(Action::Create, accessory.id)
                    .by(actor)
                    .noting(format!(
                        "created accessory {} ({} on hand)",
                        accessory.name, accessory.quantity
                    )),
            )
            .await?;
            tx.commit().await?;
            Ok(accessory)
        }
        .await;
        traced("create_accessory", result)
    }

    #[instrument(skip(self, patch, actor))]
    pub async fn update_accessory(
        &self,
        accessory_id: AccessoryId,
        patch: AccessoryPatch,
        actor: Option<UserId>,
    ) -> LifecycleResult<Accessory> {
        let result: LifecycleResult<Accessory> = async {
            let mut tx = self.store.begin().await?;
            let accessory: Accessory = fetch(&mut tx, accessory_id).await?;
            let accessory = persist(&mut tx, accessory.revise(patch)?).await?;
            tx.append(
                self.activity(Action::Update, accessory.id)
                    .by(actor)
                    .noting(format!("updated accessory {}", accessory.name)),
            )
            .await?;
            tx.commit().await?;
            Ok(accessory)
        }
        .await;
        traced("update_accessory", result)
    }

    #[instrument(skip(self, actor))]
    pub async fn delete_accessory(
        &self,
        accessory_id: AccessoryId,
        actor: Option<UserId>,
    ) -> LifecycleResult<()> {
        let result: LifecycleResult<()> = async {
            let mut tx = self.store.begin().await?;
            let accessory: Accessory = fetch(&mut tx, accessory_id).await?;
            remove(&mut tx, accessory_id).await?;
            tx.append(
                self.activity(Action::Delete, accessory_id)
                    .by(actor)
                    .noting(format!("deleted accessory {}", accessory.name)),
            )
            .await?;
            tx.commit().await?;
            Ok(())
        }
        .await;
        traced("delete_accessory", result)
    }
}
