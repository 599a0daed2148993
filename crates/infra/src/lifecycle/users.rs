use tracing::instrument;

use stockroom_assets::{Action, NewUser, User, UserId, UserPatch};

use super::{LifecycleManager, LifecycleResult, fetch, persist, remove, traced};
use crate::store::{ActivitySink, InventoryStore, Repository, StoreTx};

impl<S: InventoryStore> LifecycleManager<S> {
    #[instrument(skip_all, fields(username = %draft.username))]
    pub async fn create_user(
        &self,
        draft: NewUser,
        actor: Option<UserId>,
    ) -> LifecycleResult<User> {
        let result: LifecycleResult<User> = async {
            draft.validate()?;
            let mut tx = self.store.begin().await?;
            let user = Repository::<User>::insert(&mut tx, draft).await?;
            tx.append(
                self.activity(Action::Create, user.id)
                    .by(actor)
                    .noting(format!("created user {}", user.username)),
            )
            .await?;
            tx.commit().await?;
            Ok(user)
        }
        .await;
        traced("create_user", result)
    }

    #[instrument(skip(self, patch, actor))]
    pub async fn update_user(
        &self,
        user_id: UserId,
        patch: UserPatch,
        actor: Option<UserId>,
    ) -> LifecycleResult<User> {
        let result: LifecycleResult<User> = async {
            let mut tx = self.store.begin().await?;
            let user: User = fetch(&mut tx, user_id).await?;
            let user = persist(&mut tx, user.revise(patch)?).await?;
            tx.append(
                self.activity(Action::Update, user.id)
                    .by(actor)
                    .noting(format!("updated user {}", user.username)),
            )
            .await?;
            tx.commit().await?;
            Ok(user)
        }
        .await;
        traced("update_user", result)
    }

    /// Fails with a store constraint while the user holds a unit or appears
    /// in the audit ledger.
    #[instrument(skip(self, actor))]
    pub async fn delete_user(&self, user_id: UserId, actor: Option<UserId>) -> LifecycleResult<()> {
        let result: LifecycleResult<()> = async {
            let mut tx = self.store.begin().await?;
            let user: User = fetch(&mut tx, user_id).await?;
            remove(&mut tx, user_id).await?;
            tx.append(
                self.activity(Action::Delete, user_id)
                    .by(actor)
                    .noting(format!("deleted user {}", user.username)),
            )
            .await?;
            tx.commit().await?;
            Ok(())
        }
        .await;
        traced("delete_user", result)
    }
}
