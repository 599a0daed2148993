//! Virtual machine inventory.
//!
//! A plain inventory record: who runs where with how much. Power state is
//! recorded as reported, not driven from here.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, Id};

pub type VmId = Id<VirtualMachine>;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    Running,
    #[default]
    Stopped,
    Suspended,
}

impl PowerState {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerState::Running => "running",
            PowerState::Stopped => "stopped",
            PowerState::Suspended => "suspended",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "running" => Ok(PowerState::Running),
            "stopped" => Ok(PowerState::Stopped),
            "suspended" => Ok(PowerState::Suspended),
            other => Err(DomainError::validation(format!("unknown power state {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub id: VmId,
    pub vm_name: String,
    pub host_name: String,
    pub guest_os: String,
    pub power_state: PowerState,
    pub cpu_count: u32,
    pub memory_mb: u32,
    pub disk_gb: u32,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    /// Guest tools version/status string as reported by the hypervisor.
    pub tools_status: Option<String>,
    pub cluster: Option<String>,
    pub datastore: Option<String>,
    pub notes: Option<String>,
}

impl VirtualMachine {
    pub fn revise(&self, patch: VmPatch) -> DomainResult<VirtualMachine> {
        let mut revised = self.clone();
        revised.apply_patch(patch);
        check_shape(
            &revised.vm_name,
            &revised.host_name,
            &revised.guest_os,
            revised.cpu_count,
            revised.memory_mb,
        )?;
        Ok(revised)
    }
}

fn check_shape(
    vm_name: &str,
    host_name: &str,
    guest_os: &str,
    cpu_count: u32,
    memory_mb: u32,
) -> DomainResult<()> {
    for (field, value) in [("vm name", vm_name), ("host name", host_name), ("guest os", guest_os)] {
        if value.trim().is_empty() {
            return Err(DomainError::validation(format!("{field} cannot be empty")));
        }
    }
    if cpu_count == 0 || memory_mb == 0 {
        return Err(DomainError::validation("a VM needs at least one CPU and some memory"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVm {
    pub vm_name: String,
    pub host_name: String,
    pub guest_os: String,
    pub power_state: PowerState,
    pub cpu_count: u32,
    pub memory_mb: u32,
    pub disk_gb: u32,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub tools_status: Option<String>,
    pub cluster: Option<String>,
    pub datastore: Option<String>,
    pub notes: Option<String>,
}

impl NewVm {
    /// Stopped, 1 vCPU, 1 GiB memory, 20 GB disk.
    pub fn new(
        vm_name: impl Into<String>,
        host_name: impl Into<String>,
        guest_os: impl Into<String>,
    ) -> Self {
        Self {
            vm_name: vm_name.into(),
            host_name: host_name.into(),
            guest_os: guest_os.into(),
            power_state: PowerState::default(),
            cpu_count: 1,
            memory_mb: 1024,
            disk_gb: 20,
            ip_address: None,
            mac_address: None,
            tools_status: None,
            cluster: None,
            datastore: None,
            notes: None,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        check_shape(&self.vm_name, &self.host_name, &self.guest_os, self.cpu_count, self.memory_mb)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmPatch {
    pub vm_name: Option<String>,
    pub host_name: Option<String>,
    pub guest_os: Option<String>,
    pub power_state: Option<PowerState>,
    pub cpu_count: Option<u32>,
    pub memory_mb: Option<u32>,
    pub disk_gb: Option<u32>,
    pub ip_address: Option<Option<String>>,
    pub mac_address: Option<Option<String>>,
    pub tools_status: Option<Option<String>>,
    pub cluster: Option<Option<String>>,
    pub datastore: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl Entity for VirtualMachine {
    type Draft = NewVm;
    type Patch = VmPatch;

    const KIND: &'static str = "vm";

    fn id(&self) -> VmId {
        self.id
    }

    fn from_draft(id: VmId, draft: NewVm) -> Self {
        Self {
            id,
            vm_name: draft.vm_name,
            host_name: draft.host_name,
            guest_os: draft.guest_os,
            power_state: draft.power_state,
            cpu_count: draft.cpu_count,
            memory_mb: draft.memory_mb,
            disk_gb: draft.disk_gb,
            ip_address: draft.ip_address,
            mac_address: draft.mac_address,
            tools_status: draft.tools_status,
            cluster: draft.cluster,
            datastore: draft.datastore,
            notes: draft.notes,
        }
    }

    fn apply_patch(&mut self, patch: VmPatch) {
        if let Some(v) = patch.vm_name {
            self.vm_name = v;
        }
        if let Some(v) = patch.host_name {
            self.host_name = v;
        }
        if let Some(v) = patch.guest_os {
            self.guest_os = v;
        }
        if let Some(v) = patch.power_state {
            self.power_state = v;
        }
        if let Some(v) = patch.cpu_count {
            self.cpu_count = v;
        }
        if let Some(v) = patch.memory_mb {
            self.memory_mb = v;
        }
        if let Some(v) = patch.disk_gb {
            self.disk_gb = v;
        }
        if let Some(v) = patch.ip_address {
            self.ip_address = v;
        }
        if let Some(v) = patch.mac_address {
            self.mac_address = v;
        }
        if let Some(v) = patch.tools_status {
            self.tools_status = v;
        }
        if let Some(v) = patch.cluster {
            self.cluster = v;
        }
        if let Some(v) = patch.datastore {
            self.datastore = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_vm_defaults_are_valid() {
        let draft = NewVm::new("build-01", "esx-03", "Ubuntu 22.04");
        assert!(draft.validate().is_ok());
        assert_eq!(draft.power_state, PowerState::Stopped);
    }

    #[test]
    fn revise_keeps_required_fields() {
        let draft = NewVm::new("build-01", "esx-03", "Ubuntu 22.04");
        let vm = VirtualMachine::from_draft(Id::new(1), draft);

        let moved = vm
            .revise(VmPatch {
                host_name: Some("esx-07".into()),
                power_state: Some(PowerState::Running),
                ..VmPatch::default()
            })
            .unwrap();
        assert_eq!(moved.host_name, "esx-07");
        assert_eq!(moved.power_state, PowerState::Running);

        let err = vm
            .revise(VmPatch {
                cpu_count: Some(0),
                ..VmPatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        let blank_os = VmPatch {
            guest_os: Some("".into()),
            ..VmPatch::default()
        };
        assert!(vm.revise(blank_os).is_err());
    }

    #[test]
    fn power_state_text_round_trips() {
        for state in [PowerState::Running, PowerState::Stopped, PowerState::Suspended] {
            assert_eq!(state.as_str().parse::<PowerState>().unwrap(), state);
        }
        assert!("poweredOn".parse::<PowerState>().is_err());
    }
}
