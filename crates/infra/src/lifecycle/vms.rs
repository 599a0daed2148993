//! Virtual machine inventory, kept in the store like every other record so
//! ids and rows survive restarts and every change is on the ledger.

use tracing::instrument;

use stockroom_assets::{Action, NewVm, UserId, VirtualMachine, VmId, VmPatch};

use super::{LifecycleManager, LifecycleResult, fetch, persist, remove, traced};
use crate::store::{ActivitySink, InventoryStore, Repository, StoreTx};

impl<S: InventoryStore> LifecycleManager<S> {
    #[instrument(skip_all, fields(vm_name = %draft.vm_name, host = %draft.host_name))]
    pub async fn create_vm(
        &self,
        draft: NewVm,
        actor: Option<UserId>,
    ) -> LifecycleResult<VirtualMachine> {
        let result: LifecycleResult<VirtualMachine> = async {
            draft.validate()?;
            let mut tx = self.store.begin().await?;
            let vm = Repository::<VirtualMachine>::insert(&mut tx, draft).await?;
            tx.append(
                self.activity(Action::Create, vm.id)
                    .by(actor)
                    .noting(format!("created VM {} on {}", vm.vm_name, vm.host_name)),
            )
            .await?;
            tx.commit().await?;
            Ok(vm)
        }
        .await;
        traced("create_vm", result)
    }

    #[instrument(skip(self, patch, actor))]
    pub async fn update_vm(
        &self,
        vm_id: VmId,
        patch: VmPatch,
        actor: Option<UserId>,
    ) -> LifecycleResult<VirtualMachine> {
        let result: LifecycleResult<VirtualMachine> = async {
            let mut tx = self.store.begin().await?;
            let vm: VirtualMachine = fetch(&mut tx, vm_id).await?;
            let vm = persist(&mut tx, vm.revise(patch)?).await?;
            tx.append(
                self.activity(Action::Update, vm.id)
                    .by(actor)
                    .noting(format!("updated VM {} ({})", vm.vm_name, vm.power_state)),
            )
            .await?;
            tx.commit().await?;
            Ok(vm)
        }
        .await;
        traced("update_vm", result)
    }

    #[instrument(skip(self, actor))]
    pub async fn delete_vm(&self, vm_id: VmId, actor: Option<UserId>) -> LifecycleResult<()> {
        let result: LifecycleResult<()> = async {
            let mut tx = self.store.begin().await?;
            let vm: VirtualMachine = fetch(&mut tx, vm_id).await?;
            remove(&mut tx, vm_id).await?;
            tx.append(
                self.activity(Action::Delete, vm_id)
                    .by(actor)
                    .noting(format!("deleted VM {}", vm.vm_name)),
            )
            .await?;
            tx.commit().await?;
            Ok(())
        }
        .await;
        traced("delete_vm", result)
    }
}
