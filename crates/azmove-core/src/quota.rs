//! Destination quota checks
//!
//! Projects the usage the job will add on top of the destination's current
//! usage and fails when any counter would exceed its limit.

use azmove_model::views::{self, VirtualMachineView};
use azmove_model::{ResourceMigrationInfo, ResourceType};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::clients::{Usage, UsageOperations, VmSize};
use crate::error::{MigrationError, ValidationFailure};
use crate::job::MigrationJob;

/// Aggregate regional core counter
pub const TOTAL_CORES: &str = "cores";

/// VM size patterns and the core family quota they count against
pub const CORE_FAMILY_PATTERNS: [(&str, &str); 15] = [
    (r"^Basic_A[0-4]$", "basicAFamily"),
    (r"^Standard_A[0-7]$", "standardA0_A7Family"),
    (r"^Standard_A(8|9|10|11)$", "standardA8_A11Family"),
    (r"^Standard_D1?[1-4]$", "standardDFamily"),
    (r"^Standard_D1?[1-5]_v2$", "standardDv2Family"),
    (r"^Standard_G[1-5]$", "standardGFamily"),
    (r"^Standard_DS1?[1-4]$", "standardDSFamily"),
    (r"^Standard_DS1?[1-5]_v2$", "standardDSv2Family"),
    (r"^Standard_GS[1-5]$", "standardGSFamily"),
    (r"^Standard_F(1|2|4|8|16)$", "standardFFamily"),
    (r"^Standard_F(1|2|4|8|16)s$", "standardFSFamily"),
    (r"^Standard_NV(6|12|24)$", "standardNVFamily"),
    (r"^Standard_NC(6|12|24)$", "standardNCFamily"),
    (r"^Standard_H(8m?|16m?r?)$", "standardHFamily"),
    (r"^Standard_A(1|[248]m?)_v2$", "standardAv2Family"),
];

static CORE_FAMILIES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    CORE_FAMILY_PATTERNS
        .iter()
        .filter_map(|(pattern, family)| Regex::new(pattern).ok().map(|re| (re, *family)))
        .collect()
});

/// Core family quota a VM size counts against
#[must_use]
pub fn core_family(vm_size: &str) -> Option<&'static str> {
    CORE_FAMILIES
        .iter()
        .find(|(pattern, _)| pattern.is_match(vm_size))
        .map(|(_, family)| *family)
}

/// Checks the destination region has room for a job
pub struct QuotaValidator<'a> {
    usages: &'a dyn UsageOperations,
    location: &'a str,
}

impl<'a> QuotaValidator<'a> {
    #[must_use]
    pub fn new(usages: &'a dyn UsageOperations, location: &'a str) -> Self {
        Self { usages, location }
    }

    /// Fail if the resources `job` will create exceed any destination quota
    ///
    /// # Errors
    /// Returns [`ValidationFailure::QuotaExceeded`] listing every breached
    /// counter, or a failure for VM sizes the destination cannot host.
    #[tracing::instrument(skip_all, fields(location = %self.location))]
    pub async fn validate(&self, job: &MigrationJob) -> Result<(), MigrationError> {
        let (compute, network, storage, sizes) = tokio::try_join!(
            self.usages.list_compute_usages(self.location),
            self.usages.list_network_usages(self.location),
            self.usages.list_storage_usages(),
            self.usages.list_vm_sizes(self.location),
        )?;

        let mut usages: IndexMap<String, Usage> = compute
            .into_iter()
            .chain(network)
            .chain(storage)
            .map(|usage| (usage.name.value.to_ascii_lowercase(), usage))
            .collect();

        let vms = std::iter::once(&job.root)
            .chain(job.dependencies_of(ResourceType::VirtualMachines))
            .filter(|info| info.needs_deployment());
        for vm in vms {
            self.add_cores(&mut usages, &sizes, vm)?;
        }

        for (ty, infos) in &job.dependencies {
            let created = infos.iter().filter(|info| info.needs_deployment()).count();
            increment(&mut usages, ty.usage_name(), created);
        }
        if job.root.needs_deployment() {
            increment(&mut usages, ResourceType::VirtualMachines.usage_name(), 1);
        }

        let exceeded: Vec<String> = usages
            .values()
            .filter(|usage| usage.current_value > usage.limit)
            .map(|usage| usage.name.value.clone())
            .collect();
        if exceeded.is_empty() {
            Ok(())
        } else {
            tracing::warn!(?exceeded, "quota exceeded");
            Err(ValidationFailure::QuotaExceeded(exceeded).into())
        }
    }

    fn add_cores(
        &self,
        usages: &mut IndexMap<String, Usage>,
        sizes: &[VmSize],
        vm: &ResourceMigrationInfo,
    ) -> Result<(), MigrationError> {
        let view: VirtualMachineView = views::view(&vm.source.resource, "virtual machine")?;
        let vm_size = view.hardware_profile.vm_size;

        let family = core_family(&vm_size).ok_or_else(|| ValidationFailure::UnsupportedVmSize(vm_size.clone()))?;
        let family_key = family.to_ascii_lowercase();
        if !usages.contains_key(&family_key) {
            return Err(ValidationFailure::CoreFamilyUnavailable {
                family: family.to_string(),
                location: self.location.to_string(),
            }
            .into());
        }
        let cores = sizes
            .iter()
            .find(|size| size.name.eq_ignore_ascii_case(&vm_size))
            .map(|size| size.number_of_cores)
            .ok_or_else(|| ValidationFailure::VmSizeUnavailable {
                vm_size: vm_size.clone(),
                location: self.location.to_string(),
            })?;

        tracing::debug!(%vm_size, family, cores, "projected cores");
        for key in [family_key.as_str(), TOTAL_CORES] {
            if let Some(usage) = usages.get_mut(key) {
                usage.current_value += cores;
            }
        }
        Ok(())
    }
}

/// Types with no destination usage entry are not quota-limited
fn increment(usages: &mut IndexMap<String, Usage>, name: &str, count: usize) {
    if count == 0 {
        return;
    }
    if let Some(usage) = usages.get_mut(name) {
        usage.current_value += i64::try_from(count).unwrap_or(i64::MAX);
    }
}
