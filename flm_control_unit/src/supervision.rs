//! Alive supervision of the periodic tasks.
//!
//! Implements [`CheckpointSink`]: every task reports its entry checkpoint
//! each cycle, and once per 100 ms reference cycle the supervisor compares
//! the indication count of each entity against its expected rate. One
//! out-of-margin cycle marks an entity FAILED; staying out of margin for
//! three consecutive reference cycles EXPIRES it. The global status is the
//! worst local status and feeds the safety monitor.

use tracing::warn;

use flm_common::consts::{
    AMBIENT_PERIOD_MS, MAIN_PERIOD_MS, SAFETY_PERIOD_MS, SUPERVISION_ALIVE_MARGIN,
    SUPERVISION_CYCLE_MS, SUPERVISION_FAILED_REF_CYCLES,
};
use flm_common::supervision::{
    Checkpoint, CheckpointSink, SupervisedEntity, SupervisionStatus,
};

/// Expected entry indications per reference cycle, derived from each
/// entity's task period.
const fn expected_indications(entity: SupervisedEntity) -> u16 {
    let period = match entity {
        SupervisedEntity::SwitchInput
        | SupervisedEntity::Decision
        | SupervisedEntity::HeadlightDriver => MAIN_PERIOD_MS,
        SupervisedEntity::AmbientSensor => AMBIENT_PERIOD_MS,
        SupervisedEntity::SafetyMonitor => SAFETY_PERIOD_MS,
    };
    (SUPERVISION_CYCLE_MS / period) as u16
}

#[derive(Debug, Clone, Copy, Default)]
struct EntityRecord {
    indications: u16,
    failed_cycles: u8,
    local_status: SupervisionStatus,
}

/// Alive supervisor over the five periodic tasks.
#[derive(Debug)]
pub struct AliveSupervisor {
    entities: [EntityRecord; SupervisedEntity::ALL.len()],
    cycle_elapsed_ms: u32,
    global_status: SupervisionStatus,
    active: bool,
}

impl Default for AliveSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl AliveSupervisor {
    pub fn new() -> Self {
        let mut entities = [EntityRecord::default(); SupervisedEntity::ALL.len()];
        for record in &mut entities {
            record.local_status = SupervisionStatus::Ok;
        }
        Self {
            entities,
            cycle_elapsed_ms: 0,
            global_status: SupervisionStatus::Ok,
            active: true,
        }
    }

    /// Aggregated supervision status.
    #[inline]
    pub fn global_status(&self) -> SupervisionStatus {
        self.global_status
    }

    /// Status of one supervised entity.
    pub fn local_status(&self, entity: SupervisedEntity) -> SupervisionStatus {
        self.entities[entity.index()].local_status
    }

    /// Switch supervision off; the global status reads DEACTIVATED.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.global_status = SupervisionStatus::Deactivated;
    }

    /// One 5 ms cycle. Evaluates the reference cycle when it elapses.
    pub fn main_function(&mut self) {
        if !self.active {
            return;
        }
        self.cycle_elapsed_ms += SAFETY_PERIOD_MS;
        if self.cycle_elapsed_ms >= SUPERVISION_CYCLE_MS {
            self.cycle_elapsed_ms = 0;
            self.evaluate_reference_cycle();
        }
        self.update_global_status();
    }

    fn evaluate_reference_cycle(&mut self) {
        for entity in SupervisedEntity::ALL {
            let record = &mut self.entities[entity.index()];
            let expected = expected_indications(entity);
            let deviation = record.indications.abs_diff(expected);

            if deviation > SUPERVISION_ALIVE_MARGIN {
                record.failed_cycles = record.failed_cycles.saturating_add(1);
                record.local_status = if record.failed_cycles >= SUPERVISION_FAILED_REF_CYCLES {
                    SupervisionStatus::Expired
                } else {
                    SupervisionStatus::Failed
                };
                warn!(
                    ?entity,
                    indications = record.indications,
                    expected,
                    "alive supervision out of margin"
                );
            } else {
                record.failed_cycles = 0;
                record.local_status = SupervisionStatus::Ok;
            }
            record.indications = 0;
        }
    }

    fn update_global_status(&mut self) {
        let mut any_failed = false;
        let mut any_expired = false;
        for record in &self.entities {
            match record.local_status {
                SupervisionStatus::Failed => any_failed = true,
                SupervisionStatus::Expired => any_expired = true,
                SupervisionStatus::Ok | SupervisionStatus::Deactivated => {}
            }
        }
        self.global_status = if any_expired {
            SupervisionStatus::Expired
        } else if any_failed {
            SupervisionStatus::Failed
        } else {
            SupervisionStatus::Ok
        };
    }
}

impl CheckpointSink for AliveSupervisor {
    fn checkpoint_reached(&mut self, entity: SupervisedEntity, checkpoint: Checkpoint) {
        if !self.active {
            return;
        }
        // Secondary checkpoints trace program flow but do not count as
        // alive indications, so multi-checkpoint tasks are not penalized.
        if checkpoint == Checkpoint::MainEntry {
            let record = &mut self.entities[entity.index()];
            record.indications = record.indications.saturating_add(1);
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
