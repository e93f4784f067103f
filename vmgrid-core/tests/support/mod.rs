//! In-memory collaborators for exercising the core services without a
//! database or a fabric endpoint.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use vmgrid_core::database::ports::{
    AddressPoolRepository, BillingRepository, InstanceRepository, NewBillingRecord, NewInstance,
    NewProject, ProjectRepository, ProjectSummary, SessionRepository, TenantRepository,
};
use vmgrid_core::error::{GridError, Result};
use vmgrid_core::fabric::{
    CloneSpec, ComputeFabricClient, FabricRef, LivenessProbe, MetricsSnapshot, NotificationService,
    PowerState, TaskHandle, TaskStatus,
};
use vmgrid_model::{
    AddressRecord, BillingFilter, BillingLine, BillingRecord, BillingSummary, ComputeHost,
    FleetStats, Instance, InstanceFilter, InstanceId, InstanceStatus, Page, Project,
    ProjectCostSummary, ProjectId, Tenant, TenantId,
};

// ---------------------------------------------------------------------------
// Address pool

#[derive(Default)]
pub struct MemoryAddressPool {
    records: Mutex<Vec<AddressRecord>>,
}

impl MemoryAddressPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(segment: &str, addresses: &[&str]) -> Self {
        let records = addresses
            .iter()
            .map(|a| AddressRecord {
                address: a.parse().unwrap(),
                segment: segment.to_string(),
                available: true,
                leased_to: None,
                leased_at: None,
            })
            .collect();
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn record(&self, address: IpAddr) -> Option<AddressRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.address == address)
            .cloned()
    }

    pub fn available_count(&self) -> usize {
        self.records.lock().unwrap().iter().filter(|r| r.available).count()
    }
}

#[async_trait]
impl AddressPoolRepository for MemoryAddressPool {
    async fn insert_segment(&self, segment: &str, addresses: &[Ipv4Addr]) -> Result<u64> {
        let mut records = self.records.lock().unwrap();
        let mut inserted = 0;
        for address in addresses {
            let address = IpAddr::V4(*address);
            if records.iter().any(|r| r.address == address) {
                continue;
            }
            records.push(AddressRecord {
                address,
                segment: segment.to_string(),
                available: true,
                leased_to: None,
                leased_at: None,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn lease_next_available(
        &self,
        instance_id: InstanceId,
        now: DateTime<Utc>,
    ) -> Result<Option<AddressRecord>> {
        let mut records = self.records.lock().unwrap();
        let candidate = records
            .iter_mut()
            .filter(|r| r.available)
            .min_by_key(|r| r.address);
        match candidate {
            Some(record) => {
                record.available = false;
                record.leased_to = Some(instance_id);
                record.leased_at = Some(now);
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    async fn quarantine(&self, address: IpAddr) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.address == address) {
            record.available = false;
            record.leased_to = None;
            record.leased_at = None;
        }
        Ok(())
    }

    async fn release_for_instance(&self, instance_id: InstanceId) -> Result<Option<IpAddr>> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.leased_to == Some(instance_id)) {
            record.available = true;
            record.leased_to = None;
            record.leased_at = None;
            return Ok(Some(record.address));
        }
        Ok(None)
    }

    async fn pool_size(&self) -> Result<u64> {
        Ok(self.records.lock().unwrap().len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Instances

#[derive(Default)]
pub struct MemoryInstances {
    rows: Mutex<Vec<Instance>>,
}

impl MemoryInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, instance: Instance) {
        self.rows.lock().unwrap().push(instance);
    }

    pub fn row(&self, id: InstanceId) -> Option<Instance> {
        self.rows.lock().unwrap().iter().find(|i| i.id == id).cloned()
    }

    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl InstanceRepository for MemoryInstances {
    async fn create(&self, new: NewInstance, now: DateTime<Utc>) -> Result<Instance> {
        let instance = Instance {
            id: InstanceId::new(),
            name: new.name,
            project_id: new.project_id,
            tenant_id: new.tenant_id,
            owner: new.owner,
            deadline: new.deadline,
            fabric_handle: None,
            address: None,
            cpu_cores: new.cpu_cores,
            memory_gb: new.memory_gb,
            disk_gb: new.disk_gb,
            gpu_model: new.gpu_model,
            gpu_count: new.gpu_count,
            host_name: None,
            status: InstanceStatus::Creating,
            template_name: new.template_name,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(instance.clone());
        Ok(instance)
    }

    async fn get(&self, id: InstanceId) -> Result<Option<Instance>> {
        Ok(self.row(id))
    }

    async fn get_for_tenant(
        &self,
        id: InstanceId,
        tenant_id: TenantId,
    ) -> Result<Option<Instance>> {
        Ok(self.row(id).filter(|i| i.tenant_id == tenant_id))
    }

    async fn list(&self, filter: &InstanceFilter) -> Result<Vec<Instance>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| filter.tenant_id.is_none_or(|t| i.tenant_id == t))
            .filter(|i| filter.project_id.is_none_or(|p| i.project_id == p))
            .filter(|i| {
                filter
                    .statuses
                    .as_ref()
                    .is_none_or(|s| s.contains(&i.status))
            })
            .cloned()
            .collect())
    }

    async fn set_address(
        &self,
        id: InstanceId,
        address: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|i| i.id == id) {
            row.address = Some(address);
            row.updated_at = now;
        }
        Ok(())
    }

    async fn finalize_provisioned(
        &self,
        id: InstanceId,
        fabric_handle: &str,
        host_name: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|i| i.id == id) {
            row.fabric_handle = Some(fabric_handle.to_string());
            row.host_name = Some(host_name.to_string());
            row.status = InstanceStatus::Stopped;
            row.updated_at = now;
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id: InstanceId,
        status: InstanceStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|i| i.id == id) {
            row.status = status;
            row.updated_at = now;
        }
        Ok(())
    }

    async fn update_statuses(
        &self,
        updates: &[(InstanceId, InstanceStatus)],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        for (id, status) in updates {
            if let Some(row) = rows.iter_mut().find(|i| i.id == *id) {
                row.status = *status;
                row.updated_at = now;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: InstanceId) -> Result<()> {
        self.rows.lock().unwrap().retain(|i| i.id != id);
        Ok(())
    }

    async fn find_active(&self) -> Result<Vec<Instance>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.status.is_active())
            .cloned()
            .collect())
    }

    async fn find_expiring_within(
        &self,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Result<Vec<Instance>> {
        let end = now + chrono::Duration::days(window_days);
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.status.is_active() && i.deadline > now && i.deadline <= end)
            .cloned()
            .collect())
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Instance>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.status.is_active() && i.deadline <= now)
            .cloned()
            .collect())
    }

    async fn find_reconcilable(&self) -> Result<Vec<Instance>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.status.is_active() && i.fabric_handle.is_some())
            .cloned()
            .collect())
    }

    async fn fleet_stats(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Result<FleetStats> {
        let rows = self.rows.lock().unwrap();
        let soon = now + chrono::Duration::days(7);
        let mine: Vec<&Instance> = rows
            .iter()
            .filter(|i| i.tenant_id == tenant_id && i.status != InstanceStatus::Deleted)
            .collect();
        let active: Vec<&&Instance> = mine.iter().filter(|i| i.status.is_active()).collect();
        Ok(FleetStats {
            total: mine.len() as u64,
            running: mine
                .iter()
                .filter(|i| i.status == InstanceStatus::Running)
                .count() as u64,
            stopped: mine
                .iter()
                .filter(|i| i.status == InstanceStatus::Stopped)
                .count() as u64,
            expiring_soon: active
                .iter()
                .filter(|i| i.deadline > now && i.deadline <= soon)
                .count() as u64,
            expired: mine
                .iter()
                .filter(|i| i.status == InstanceStatus::Expired)
                .count() as u64,
            total_cpu_cores: active.iter().map(|i| i64::from(i.cpu_cores)).sum(),
            total_memory_gb: active.iter().map(|i| i64::from(i.memory_gb)).sum(),
            total_disk_gb: active.iter().map(|i| i64::from(i.disk_gb)).sum(),
            total_gpus: active.iter().map(|i| i64::from(i.gpu_count)).sum(),
            projects: mine
                .iter()
                .map(|i| i.project_id)
                .collect::<HashSet<_>>()
                .len() as u64,
        })
    }
}

// ---------------------------------------------------------------------------
// Billing

#[derive(Default)]
pub struct MemoryBilling {
    rows: Mutex<Vec<BillingRecord>>,
}

impl MemoryBilling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<BillingRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingRepository for MemoryBilling {
    async fn exists_for(&self, instance_id: InstanceId, billing_date: NaiveDate) -> Result<bool> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.instance_id == instance_id && r.billing_date == billing_date))
    }

    async fn insert_batch(&self, records: &[NewBillingRecord], now: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let mut written = 0;
        for record in records {
            let exists = rows
                .iter()
                .any(|r| r.instance_id == record.instance_id && r.billing_date == record.billing_date);
            if exists {
                continue;
            }
            rows.push(BillingRecord {
                id: uuid::Uuid::now_v7(),
                instance_id: record.instance_id,
                project_id: record.project_id,
                tenant_id: record.tenant_id,
                billing_date: record.billing_date,
                cpu_cost: record.costs.cpu_cost,
                memory_cost: record.costs.memory_cost,
                disk_cost: record.costs.disk_cost,
                gpu_cost: record.costs.gpu_cost,
                total_cost: record.costs.total_cost,
                created_at: now,
            });
            written += 1;
        }
        Ok(written)
    }

    async fn summary(&self, filter: &BillingFilter) -> Result<BillingSummary> {
        let rows = self.rows.lock().unwrap();
        let matching: Vec<&BillingRecord> = rows
            .iter()
            .filter(|r| r.tenant_id == filter.tenant_id)
            .filter(|r| filter.project_id.is_none_or(|p| r.project_id == p))
            .filter(|r| filter.from.is_none_or(|d| r.billing_date >= d))
            .filter(|r| filter.to.is_none_or(|d| r.billing_date <= d))
            .collect();

        let mut summary = BillingSummary {
            record_count: matching.len() as u64,
            ..Default::default()
        };
        let mut by_project: HashMap<ProjectId, ProjectCostSummary> = HashMap::new();
        for record in &matching {
            let entry = by_project
                .entry(record.project_id)
                .or_insert_with(|| ProjectCostSummary {
                    project_id: record.project_id,
                    project_name: record.project_id.to_string(),
                    project_code: record.project_id.to_string(),
                    cpu_cost: 0.0,
                    memory_cost: 0.0,
                    disk_cost: 0.0,
                    gpu_cost: 0.0,
                    total_cost: 0.0,
                    instance_count: 0,
                });
            entry.cpu_cost += record.cpu_cost;
            entry.memory_cost += record.memory_cost;
            entry.disk_cost += record.disk_cost;
            entry.gpu_cost += record.gpu_cost;
            entry.total_cost += record.total_cost;
            summary.total_cost += record.total_cost;
        }
        for (project_id, entry) in by_project.iter_mut() {
            entry.instance_count = matching
                .iter()
                .filter(|r| r.project_id == *project_id)
                .map(|r| r.instance_id)
                .collect::<HashSet<_>>()
                .len() as u64;
        }
        summary.projects = by_project.into_values().collect();
        Ok(summary)
    }

    async fn details(
        &self,
        filter: &BillingFilter,
        page: Page,
    ) -> Result<(Vec<BillingLine>, u64)> {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<&BillingRecord> = rows
            .iter()
            .filter(|r| r.tenant_id == filter.tenant_id)
            .filter(|r| filter.project_id.is_none_or(|p| r.project_id == p))
            .filter(|r| filter.from.is_none_or(|d| r.billing_date >= d))
            .filter(|r| filter.to.is_none_or(|d| r.billing_date <= d))
            .collect();
        matching.sort_by(|a, b| b.billing_date.cmp(&a.billing_date));

        let total = matching.len() as u64;
        let lines = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .map(|record| BillingLine {
                record: record.clone(),
                instance_name: record.instance_id.to_string(),
                owner: String::new(),
            })
            .collect();
        Ok((lines, total))
    }
}

// ---------------------------------------------------------------------------
// Projects, tenants, sessions

#[derive(Default)]
pub struct MemoryProjects {
    rows: Mutex<Vec<Project>>,
}

impl MemoryProjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(tenant_id: TenantId) -> (Self, ProjectId) {
        let project = Project {
            id: ProjectId::new(),
            name: "research".into(),
            code: "RES-001".into(),
            tenant_id,
            created_at: Utc::now(),
        };
        let id = project.id;
        (
            Self {
                rows: Mutex::new(vec![project]),
            },
            id,
        )
    }
}

#[async_trait]
impl ProjectRepository for MemoryProjects {
    async fn create(&self, new: NewProject, now: DateTime<Utc>) -> Result<Project> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|p| p.code == new.code) {
            return Err(GridError::Validation(format!(
                "project code already in use: {}",
                new.code
            )));
        }
        let project = Project {
            id: ProjectId::new(),
            name: new.name,
            code: new.code,
            tenant_id: new.tenant_id,
            created_at: now,
        };
        rows.push(project.clone());
        Ok(project)
    }

    async fn get_owned(&self, id: ProjectId, tenant_id: TenantId) -> Result<Option<Project>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id && p.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<ProjectSummary>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.tenant_id == tenant_id)
            .map(|p| ProjectSummary {
                project: p.clone(),
                instance_count: 0,
            })
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryTenants {
    rows: Mutex<Vec<Tenant>>,
}

impl MemoryTenants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(email: Option<&str>) -> (Self, TenantId) {
        let tenant = Tenant {
            id: TenantId::new(),
            directory_uid: "uid-1".into(),
            username: "alice".into(),
            display_name: Some("Alice".into()),
            email: email.map(Into::into),
            department: None,
            active: true,
            created_at: Utc::now(),
            last_login: None,
        };
        let id = tenant.id;
        (
            Self {
                rows: Mutex::new(vec![tenant]),
            },
            id,
        )
    }
}

#[async_trait]
impl TenantRepository for MemoryTenants {
    async fn get(&self, id: TenantId) -> Result<Option<Tenant>> {
        Ok(self.rows.lock().unwrap().iter().find(|t| t.id == id).cloned())
    }
}

#[derive(Default)]
pub struct MemorySessions {
    expiries: Mutex<Vec<DateTime<Utc>>>,
}

impl MemorySessions {
    pub fn with_expiries(expiries: Vec<DateTime<Utc>>) -> Self {
        Self {
            expiries: Mutex::new(expiries),
        }
    }

    pub fn remaining(&self) -> usize {
        self.expiries.lock().unwrap().len()
    }
}

#[async_trait]
impl SessionRepository for MemorySessions {
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut expiries = self.expiries.lock().unwrap();
        let before = expiries.len();
        expiries.retain(|e| *e >= now);
        Ok((before - expiries.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Fabric

#[derive(Debug, Clone)]
pub enum CloneScript {
    /// The clone task completes and produces this entity handle.
    Succeed { handle: String },
    /// The task reports failure with this reason.
    FailTask { reason: String },
    /// Starting the clone itself errors.
    ErrorOnStart,
    /// The task never completes; every poll reports it still running.
    NeverFinish,
}

pub struct FakeFabric {
    hosts: Mutex<Vec<ComputeHost>>,
    clone_script: Mutex<CloneScript>,
    tasks: Mutex<HashMap<String, TaskStatus>>,
    task_counter: AtomicUsize,
    pub entities: Mutex<HashMap<String, PowerState>>,
    pub destroyed: Mutex<Vec<String>>,
    pub power_on_calls: Mutex<Vec<String>>,
    pub power_off_calls: Mutex<Vec<String>>,
    pub fail_destroy: AtomicBool,
}

impl FakeFabric {
    pub fn new() -> Self {
        Self {
            hosts: Mutex::new(Vec::new()),
            clone_script: Mutex::new(CloneScript::Succeed {
                handle: "entity-1".into(),
            }),
            tasks: Mutex::new(HashMap::new()),
            task_counter: AtomicUsize::new(0),
            entities: Mutex::new(HashMap::new()),
            destroyed: Mutex::new(Vec::new()),
            power_on_calls: Mutex::new(Vec::new()),
            power_off_calls: Mutex::new(Vec::new()),
            fail_destroy: AtomicBool::new(false),
        }
    }

    pub fn set_hosts(&self, hosts: Vec<ComputeHost>) {
        *self.hosts.lock().unwrap() = hosts;
    }

    pub fn script_clone(&self, script: CloneScript) {
        *self.clone_script.lock().unwrap() = script;
    }

    pub fn add_entity(&self, handle: &str, state: PowerState) {
        self.entities.lock().unwrap().insert(handle.to_string(), state);
    }

    pub fn destroyed_handles(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

impl Default for FakeFabric {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComputeFabricClient for FakeFabric {
    async fn list_hosts(&self) -> Result<Vec<ComputeHost>> {
        Ok(self.hosts.lock().unwrap().clone())
    }

    async fn clone_from_template(&self, _spec: &CloneSpec) -> Result<TaskHandle> {
        let script = self.clone_script.lock().unwrap().clone();
        let task = format!("task-{}", self.task_counter.fetch_add(1, Ordering::SeqCst));
        let outcome = match script {
            CloneScript::ErrorOnStart => {
                return Err(GridError::Upstream("clone rejected".into()));
            }
            // No recorded outcome, so polls report the task still running.
            CloneScript::NeverFinish => return Ok(TaskHandle(task)),
            CloneScript::Succeed { handle } => {
                self.entities
                    .lock()
                    .unwrap()
                    .insert(handle.clone(), PowerState::Off);
                TaskStatus::Succeeded { handle }
            }
            CloneScript::FailTask { reason } => TaskStatus::Failed(reason),
        };
        self.tasks.lock().unwrap().insert(task.clone(), outcome);
        Ok(TaskHandle(task))
    }

    async fn poll_task(&self, task: &TaskHandle) -> Result<TaskStatus> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .get(&task.0)
            .cloned()
            .unwrap_or(TaskStatus::Running))
    }

    async fn power_on(&self, handle: &str) -> Result<bool> {
        self.power_on_calls.lock().unwrap().push(handle.to_string());
        let mut entities = self.entities.lock().unwrap();
        match entities.insert(handle.to_string(), PowerState::On) {
            Some(PowerState::On) => Ok(false),
            _ => Ok(true),
        }
    }

    async fn power_off(&self, handle: &str) -> Result<bool> {
        self.power_off_calls.lock().unwrap().push(handle.to_string());
        let mut entities = self.entities.lock().unwrap();
        match entities.insert(handle.to_string(), PowerState::Off) {
            Some(PowerState::Off) => Ok(false),
            _ => Ok(true),
        }
    }

    async fn reset(&self, handle: &str) -> Result<bool> {
        Ok(self.entities.lock().unwrap().contains_key(handle))
    }

    async fn destroy(&self, handle: &str) -> Result<bool> {
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(GridError::Upstream("destroy failed".into()));
        }
        let removed = self.entities.lock().unwrap().remove(handle).is_some();
        self.destroyed.lock().unwrap().push(handle.to_string());
        Ok(removed)
    }

    async fn metrics(&self, handle: &str) -> Result<Option<MetricsSnapshot>> {
        Ok(self
            .entities
            .lock()
            .unwrap()
            .get(handle)
            .map(|state| MetricsSnapshot {
                cpu_usage_percent: 12.5,
                memory_usage_mb: 2048.0,
                disk_usage_gb: 40.0,
                power_state: *state,
                uptime_seconds: 3600,
            }))
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<FabricRef>> {
        Ok(self
            .entities
            .lock()
            .unwrap()
            .get(handle)
            .map(|state| FabricRef {
                handle: handle.to_string(),
                power_state: *state,
            }))
    }
}

// ---------------------------------------------------------------------------
// Probe and notifier

#[derive(Default)]
pub struct FakeProbe {
    live: Mutex<HashSet<IpAddr>>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_live(addresses: &[&str]) -> Self {
        Self {
            live: Mutex::new(addresses.iter().map(|a| a.parse().unwrap()).collect()),
        }
    }
}

#[async_trait]
impl LivenessProbe for FakeProbe {
    async fn is_reachable(&self, address: IpAddr, _timeout: Duration) -> bool {
        self.live.lock().unwrap().contains(&address)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(String, InstanceId, i64)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, InstanceId, i64)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationService for RecordingNotifier {
    async fn notify_expiry(
        &self,
        recipient: &str,
        instance: &Instance,
        days_until_expiry: i64,
    ) -> Result<bool> {
        self.events
            .lock()
            .unwrap()
            .push((recipient.to_string(), instance.id, days_until_expiry));
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Fixtures

pub fn instance_fixture(
    tenant_id: TenantId,
    project_id: ProjectId,
    status: InstanceStatus,
    deadline: DateTime<Utc>,
) -> Instance {
    let now = Utc::now();
    Instance {
        id: InstanceId::new(),
        name: "vm-1".into(),
        project_id,
        tenant_id,
        owner: "alice".into(),
        deadline,
        fabric_handle: Some("entity-1".into()),
        address: Some("192.168.100.2".parse().unwrap()),
        cpu_cores: 4,
        memory_gb: 16,
        disk_gb: 200,
        gpu_model: None,
        gpu_count: 0,
        host_name: Some("auto-assigned".into()),
        status,
        template_name: "ubuntu-22.04".into(),
        created_at: now,
        updated_at: now,
    }
}
