//! License seats and license administration.

use tracing::{info, instrument, warn};

use stockroom_assets::{
    Action, License, LicenseAssignment, LicenseAssignmentId, LicenseId, LicensePatch, NewLicense,
    SeatDecision, SeatRequest, UserId,
};
use stockroom_core::Entity;

use super::{LifecycleManager, LifecycleResult, fetch, persist, remove, traced};
use crate::store::{ActivitySink, AssignmentQueries, InventoryStore, Repository, StoreTx};

fn active_seats(assignments: &[LicenseAssignment]) -> usize {
    assignments.iter().filter(|a| a.status.is_active()).count()
}

impl<S: InventoryStore> LifecycleManager<S> {
    #[instrument(skip_all, fields(name = %draft.name))]
    pub async fn create_license(
        &self,
        draft: NewLicense,
        actor: Option<UserId>,
    ) -> LifecycleResult<License> {
        let result: LifecycleResult<License> = async {
            draft.validate()?;
            let mut tx = self.store.begin().await?;
            let license = Repository::<License>::insert(&mut tx, draft).await?;
            tx.append(
                self.activity(Action::Create, license.id)
                    .by(actor)
                    .noting(format!("created license {}", license.name)),
            )
            .await?;
            tx.commit().await?;
            Ok(license)
        }
        .await;
        traced("create_license", result)
    }

    #[instrument(skip(self, patch, actor))]
    pub async fn update_license(
        &self,
        license_id: LicenseId,
        patch: LicensePatch,
        actor: Option<UserId>,
    ) -> LifecycleResult<License> {
        let result: LifecycleResult<License> = async {
            let mut tx = self.store.begin().await?;
            let license: License = fetch(&mut tx, license_id).await?;
            let active = active_seats(&tx.license_assignments(license_id).await?);
            let revised = license.revise(patch, active, self.policy.seat_policy)?;
            let license = persist(&mut tx, revised).await?;
            tx.append(
                self.activity(Action::Update, license.id)
                    .by(actor)
                    .noting(format!("updated license {}", license.name)),
            )
            .await?;
            tx.commit().await?;
            Ok(license)
        }
        .await;
        traced("update_license", result)
    }

    /// Delete a license and every assignment row referencing it. Active
    /// seats are discarded, not returned.
    #[instrument(skip(self, actor), fields(license_id = %license_id))]
    pub async fn delete_license(
        &self,
        license_id: LicenseId,
        actor: Option<UserId>,
    ) -> LifecycleResult<()> {
        let result: LifecycleResult<()> = async {
            let mut tx = self.store.begin().await?;
            let license: License = fetch(&mut tx, license_id).await?;
            let discarded = tx.delete_license_assignments(license_id).await?;
            remove(&mut tx, license_id).await?;
            tx.append(
                self.activity(Action::Delete, license_id)
                    .by(actor)
                    .noting(format!(
                        "deleted license {} with {discarded} assignments",
                        license.name
                    )),
            )
            .await?;
            tx.commit().await?;
            info!(license_id = %license_id, discarded, "license deleted");
            Ok(())
        }
        .await;
        traced("delete_license", result)
    }

    /// Grant one seat. The license row stays locked until commit, so
    /// concurrent grants see each other's seats when checking the ceiling.
    #[instrument(
        skip(self, request, actor),
        fields(license_id = %license_id, assignee = %request.assignee)
    )]
    pub async fn assign_seat(
        &self,
        license_id: LicenseId,
        request: SeatRequest,
        actor: Option<UserId>,
    ) -> LifecycleResult<LicenseAssignment> {
        let result: LifecycleResult<LicenseAssignment> = async {
            let mut tx = self.store.begin().await?;
            let license: License = fetch(&mut tx, license_id).await?;
            let active = active_seats(&tx.license_assignments(license_id).await?);
            match license.check_seat_ceiling(active, self.policy.seat_policy)? {
                SeatDecision::WithinCeiling => {}
                SeatDecision::OverAllocated { seats, active } => {
                    warn!(license_id = %license_id, seats, active, "license over-allocated");
                }
            }

            let draft = license.grant_seat(request, self.clock.today())?;
            let seat = Repository::<LicenseAssignment>::insert(&mut tx, draft).await?;
            tx.append(
                self.activity(Action::Update, license.id)
                    .by(actor)
                    .noting(format!("seat of {} assigned to {}", license.name, seat.assignee)),
            )
            .await?;
            tx.commit().await?;
            Ok(seat)
        }
        .await;
        traced("assign_seat", result)
    }

    /// Return a seat to the pool.
    #[instrument(skip(self, actor), fields(assignment_id = %assignment_id))]
    pub async fn revoke_seat(
        &self,
        assignment_id: LicenseAssignmentId,
        actor: Option<UserId>,
    ) -> LifecycleResult<LicenseAssignment> {
        let result: LifecycleResult<LicenseAssignment> = async {
            let mut tx = self.store.begin().await?;
            let seat: LicenseAssignment = fetch(&mut tx, assignment_id).await?;
            let patch = seat.revoke(self.clock.today())?;
            let mut next = seat;
            next.apply_patch(patch);
            let seat = persist(&mut tx, next).await?;
            tx.append(
                self.activity(Action::Update, seat.license_id)
                    .by(actor)
                    .noting(format!("seat revoked from {}", seat.assignee)),
            )
            .await?;
            tx.commit().await?;
            Ok(seat)
        }
        .await;
        traced("revoke_seat", result)
    }

    /// Every assignment row of the license, oldest first.
    #[instrument(skip(self))]
    pub async fn list_assignments(
        &self,
        license_id: LicenseId,
    ) -> LifecycleResult<Vec<LicenseAssignment>> {
        let result: LifecycleResult<Vec<LicenseAssignment>> = async {
            let mut tx = self.store.begin().await?;
            let _: License = fetch(&mut tx, license_id).await?;
            Ok(tx.license_assignments(license_id).await?)
        }
        .await;
        traced("list_assignments", result)
    }
}
