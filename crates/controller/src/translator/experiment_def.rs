// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Experiment definitions (C7): the built-in catalog plus the slot-width
//! math shared with the scheduler.

use std::time::Duration;

use tracing::warn;

use crate::resource::node::NodeType;
use crate::scheduler::SLOT_SIZE;

#[derive(Debug, Clone)]
pub struct Sequence {
    pub name: String,
    pub class_name: String,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct AgentSequence {
    pub name: String,
    pub node_type: NodeType,
    pub sequences: Vec<Sequence>,
}

#[derive(Debug, Clone)]
pub struct Experiment {
    pub name: String,
    pub agent_sequences: Vec<AgentSequence>,
}

pub fn num_timeslots(sequence: &Sequence) -> usize {
    let slots = sequence.duration.as_secs_f64() / SLOT_SIZE.as_secs_f64();
    slots.ceil() as usize
}

pub fn agent_sequence_slot_width(agent_sequence: &AgentSequence) -> usize {
    agent_sequence.sequences.iter().map(num_timeslots).sum()
}

/// Single-photon entanglement generation run against the two `QNode`
/// endpoints of a path; each endpoint runs its own copy of the generation
/// sequence.
pub fn simple_experiment() -> Experiment {
    let egp_sequence = || AgentSequence {
        name: "Entanglement Generation sequence for Qnode".to_owned(),
        node_type: NodeType::QNode,
        sequences: vec![Sequence {
            name: "experiments/single_photon_calibration.py".to_owned(),
            class_name: "SinglePhotonGeneration".to_owned(),
            duration: Duration::from_secs(10),
        }],
    };
    Experiment { name: "Simple Experiment".to_owned(), agent_sequences: vec![egp_sequence(), egp_sequence()] }
}

/// Source/destination BSM calibration: init, generation/calibration, and
/// cleanup phases run against the two endpoint nodes of a path.
pub fn calibration_experiment() -> Experiment {
    let cleanup = || Sequence {
        name: "calibration.cleanUp".to_owned(),
        class_name: "CalibrationCleanup".to_owned(),
        duration: Duration::from_secs(1),
    };
    Experiment {
        name: "Calibration".to_owned(),
        agent_sequences: vec![
            AgentSequence {
                name: "Calibration Source Sequence".to_owned(),
                node_type: NodeType::BsmNode,
                sequences: vec![
                    Sequence { name: "calibration.srcInit".to_owned(), class_name: "CalibrationSrcInit".to_owned(), duration: Duration::from_secs(1) },
                    Sequence { name: "calibration.generation".to_owned(), class_name: "CalibrationGeneration".to_owned(), duration: Duration::from_secs(1) },
                    cleanup(),
                ],
            },
            AgentSequence {
                name: "Calibration Destination Sequence".to_owned(),
                node_type: NodeType::BsmNode,
                sequences: vec![
                    Sequence { name: "calibration.dstInit".to_owned(), class_name: "CalibrationDstInit".to_owned(), duration: Duration::from_secs(1) },
                    Sequence { name: "calibration.calibration".to_owned(), class_name: "CalibrationCalibration".to_owned(), duration: Duration::from_secs(1) },
                    cleanup(),
                ],
            },
        ],
    }
}

/// Built-in catalog plus any user-provided definitions, same-name user
/// entries override built-ins with a warning.
pub struct ExperimentCatalog {
    defs: Vec<Experiment>,
}

impl ExperimentCatalog {
    pub fn new(user_defined: Vec<Experiment>) -> Self {
        let mut defs = vec![simple_experiment(), calibration_experiment()];
        for user in user_defined {
            if let Some(pos) = defs.iter().position(|e| e.name == user.name) {
                warn!(name = %user.name, "built-in experiment definition overwritten by user-provided source");
                defs[pos] = user;
            } else {
                defs.push(user);
            }
        }
        Self { defs }
    }

    pub fn get(&self, name: &str) -> Option<&Experiment> {
        self.defs.iter().find(|e| e.name == name)
    }
}

impl Default for ExperimentCatalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
#[path = "experiment_def_tests.rs"]
mod tests;
