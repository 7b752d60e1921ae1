//! Phased deployment
//!
//! A [`Deployable`] is an ordered list of phases. Resources inside one phase
//! do not depend on each other and are created concurrently; a phase starts
//! only after every create of the previous phase has finished.

use azmove_model::ResourceMigrationInfo;
use futures::future::join_all;

use crate::clients::ManagementClients;
use crate::error::MigrationError;
use crate::job::resource_type_of;
use crate::observer::{MigrationEvent, MigrationObserver};

/// Resources of one job grouped into dependency-ordered phases
#[derive(Debug, Default)]
pub struct Deployable<'a> {
    phases: Vec<Vec<&'a ResourceMigrationInfo>>,
}

impl<'a> Deployable<'a> {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one phase made of every resource in `groups`
    pub fn add_phase(&mut self, groups: &[&'a [ResourceMigrationInfo]]) {
        self.phases
            .push(groups.iter().flat_map(|group| group.iter()).collect());
    }

    #[inline]
    #[must_use]
    pub fn phases(&self) -> &[Vec<&'a ResourceMigrationInfo>] {
        &self.phases
    }

    /// Number of resources that will actually be created
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.phases
            .iter()
            .flatten()
            .filter(|info| info.needs_deployment())
            .count()
    }

    /// Create every resource that validation marked for deployment
    ///
    /// All creates of a phase run to completion even if one of them fails;
    /// the phase then reports the first failure and no later phase starts.
    ///
    /// # Errors
    /// Returns the first provider failure of the failing phase.
    #[tracing::instrument(skip_all, fields(phases = self.phases.len()))]
    pub async fn deploy(
        &self,
        clients: &ManagementClients,
        observer: &dyn MigrationObserver,
    ) -> Result<(), MigrationError> {
        let total = self.phases.len();
        for (index, phase) in self.phases.iter().enumerate() {
            observer.on_event(&MigrationEvent::PhaseStarted {
                index: index + 1,
                total,
                resources: phase.len(),
            });

            let creates = phase
                .iter()
                .filter(|info| info.needs_deployment())
                .map(|info| deploy_one(info, clients, observer));
            let results = join_all(creates).await;
            if let Some(err) = results.into_iter().find_map(Result::err) {
                tracing::error!(phase = index + 1, error = %err, "phase failed");
                return Err(err);
            }
        }
        Ok(())
    }
}

async fn deploy_one(
    info: &ResourceMigrationInfo,
    clients: &ManagementClients,
    observer: &dyn MigrationObserver,
) -> Result<(), MigrationError> {
    let id = &info.destination.id;
    let Some(payload) = info.destination.resource.clone() else {
        return Ok(());
    };
    let ops = clients.operations(resource_type_of(id)?)?;

    observer.on_event(&MigrationEvent::ResourceDeploying { id: id.to_string() });
    ops.create_or_update(id.resource_group(), id.resource_name(), payload)
        .await?;
    tracing::debug!(%id, "deployed");
    Ok(())
}
