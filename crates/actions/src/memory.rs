//! In-process collaborators for tests and single-node deployments.

use std::sync::Mutex;

use verdict_core::StoreError;

use crate::traits::{Alarm, AlarmStore, TicketingClient, WorkOrder};

/// Keeps alarms in a vector; ids are `ALM-<n>`.
#[derive(Debug, Default)]
pub struct InMemoryAlarmStore {
    alarms: Mutex<Vec<Alarm>>,
}

impl InMemoryAlarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alarms(&self) -> Vec<Alarm> {
        self.alarms.lock().expect("alarm store lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl AlarmStore for InMemoryAlarmStore {
    async fn create_alarm(&self, alarm: &Alarm) -> Result<String, StoreError> {
        let mut alarms = self.alarms.lock().expect("alarm store lock poisoned");
        alarms.push(alarm.clone());
        Ok(format!("ALM-{}", alarms.len()))
    }
}

/// Records work orders; the external reference echoes the ticket id.
#[derive(Debug, Default)]
pub struct InMemoryTicketing {
    orders: Mutex<Vec<WorkOrder>>,
}

impl InMemoryTicketing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> Vec<WorkOrder> {
        self.orders.lock().expect("ticketing lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl TicketingClient for InMemoryTicketing {
    async fn create_ticket(&self, order: &WorkOrder) -> Result<String, StoreError> {
        self.orders
            .lock()
            .expect("ticketing lock poisoned")
            .push(order.clone());
        Ok(format!("ext-{}", order.ticket_id))
    }
}
