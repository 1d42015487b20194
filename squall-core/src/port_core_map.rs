//! Parses the operator-supplied `port:core[,core...]` mapping into per-port queue counts and
//! per-core task lists.

use std::collections::{HashMap, HashSet};

use crate::{MAX_CORES_PER_PORT, MAX_QUEUES_PER_CORE};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MapError {
    #[error("invalid mapping chunk {chunk:?}: expected \"port:core[,core...]\"")]
    Malformed { chunk: String },
    #[error("port {port} is reserved for statistics/reporting; core 0 cannot be assigned a queue")]
    CoreReserved { port: u16 },
    #[error("port {port} is mapped more than once")]
    DuplicatePort { port: u16 },
    #[error("port {port} has an empty core list")]
    EmptyCoreList { port: u16 },
    #[error("port {port} requests {requested} cores, but at most {MAX_CORES_PER_PORT} are supported")]
    TooManyCoresForPort { port: u16, requested: usize },
    #[error("core {core} is not enabled by the runtime")]
    CoreNotEnabled { core: usize },
    #[error("core {core} would be assigned {assigned} queues, more than the {MAX_QUEUES_PER_CORE} it can serve")]
    CoreQueueBudgetExceeded { core: usize, assigned: usize },
    #[error("port {port} is unknown (only {available} ports were discovered)")]
    UnknownPort { port: u16, available: u16 },
}

/// A single port's queue count and the core that services each queue, in queue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    pub port: u16,
    pub cores: Vec<usize>,
}

impl PortConfig {
    pub fn num_queues(&self) -> usize {
        self.cores.len()
    }
}

/// One core's list of `(port, queue)` tasks, built by [`PortCoreMap::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreWork {
    pub tasks: Vec<(u16, u16)>,
}

#[derive(Debug, Clone, Default)]
pub struct PortCoreMap {
    ports: Vec<PortConfig>,
    cores: HashMap<usize, CoreWork>,
}

impl PortCoreMap {
    /// Parses `mapping` (e.g. `"0:1,2 1:3"`) against the set of `enabled_cores` and the number
    /// of `available_ports` the runtime discovered.
    pub fn parse(mapping: &str, available_ports: u16, enabled_cores: &HashSet<usize>) -> Result<Self, MapError> {
        let mut ports = Vec::new();
        let mut seen_ports = HashSet::new();
        let mut queues_per_core: HashMap<usize, usize> = HashMap::new();

        for chunk in mapping.split_whitespace() {
            let (port_str, cores_str) = chunk
                .split_once(':')
                .ok_or_else(|| MapError::Malformed { chunk: chunk.to_owned() })?;

            let port: u16 = port_str
                .parse()
                .map_err(|_| MapError::Malformed { chunk: chunk.to_owned() })?;

            if port >= available_ports {
                return Err(MapError::UnknownPort {
                    port,
                    available: available_ports,
                });
            }
            if !seen_ports.insert(port) {
                return Err(MapError::DuplicatePort { port });
            }

            let mut cores = Vec::new();
            for core_str in cores_str.split(',') {
                let core: usize = core_str
                    .parse()
                    .map_err(|_| MapError::Malformed { chunk: chunk.to_owned() })?;
                cores.push(core);
            }

            if cores.is_empty() {
                return Err(MapError::EmptyCoreList { port });
            }
            if cores.len() > MAX_CORES_PER_PORT {
                return Err(MapError::TooManyCoresForPort {
                    port,
                    requested: cores.len(),
                });
            }
            if cores.contains(&0) {
                return Err(MapError::CoreReserved { port });
            }
            for &core in &cores {
                if !enabled_cores.contains(&core) {
                    return Err(MapError::CoreNotEnabled { core });
                }
                let assigned = queues_per_core.entry(core).or_insert(0);
                *assigned += 1;
                if *assigned > MAX_QUEUES_PER_CORE {
                    return Err(MapError::CoreQueueBudgetExceeded {
                        core,
                        assigned: *assigned,
                    });
                }
            }

            ports.push(PortConfig { port, cores });
        }

        let mut cores: HashMap<usize, CoreWork> = HashMap::new();
        for port_config in &ports {
            for (queue, &core) in port_config.cores.iter().enumerate() {
                cores
                    .entry(core)
                    .or_default()
                    .tasks
                    .push((port_config.port, queue as u16));
            }
        }

        Ok(Self { ports, cores })
    }

    pub fn ports(&self) -> &[PortConfig] {
        &self.ports
    }

    pub fn core_work(&self, core: usize) -> Option<&CoreWork> {
        self.cores.get(&core)
    }

    pub fn worker_cores(&self) -> impl Iterator<Item = usize> + '_ {
        self.cores.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(cores: &[usize]) -> HashSet<usize> {
        cores.iter().copied().collect()
    }

    #[test]
    fn parses_a_single_port_single_core_mapping() {
        let map = PortCoreMap::parse("0:1", 1, &enabled(&[1])).unwrap();
        assert_eq!(map.ports(), &[PortConfig { port: 0, cores: vec![1] }]);
        assert_eq!(map.core_work(1).unwrap().tasks, vec![(0, 0)]);
    }

    #[test]
    fn parses_multiple_queues_on_one_port() {
        let map = PortCoreMap::parse("0:1,2,3", 1, &enabled(&[1, 2, 3])).unwrap();
        assert_eq!(map.ports()[0].num_queues(), 3);
        assert_eq!(map.core_work(2).unwrap().tasks, vec![(0, 1)]);
    }

    #[test]
    fn rejects_core_zero() {
        let err = PortCoreMap::parse("0:0", 1, &enabled(&[0])).unwrap_err();
        assert_eq!(err, MapError::CoreReserved { port: 0 });
    }

    #[test]
    fn rejects_duplicate_ports() {
        let err = PortCoreMap::parse("0:1 0:2", 2, &enabled(&[1, 2])).unwrap_err();
        assert_eq!(err, MapError::DuplicatePort { port: 0 });
    }

    #[test]
    fn rejects_a_core_the_runtime_did_not_enable() {
        let err = PortCoreMap::parse("0:1", 1, &enabled(&[2])).unwrap_err();
        assert_eq!(err, MapError::CoreNotEnabled { core: 1 });
    }

    #[test]
    fn rejects_a_port_id_beyond_the_discovered_port_count() {
        let err = PortCoreMap::parse("3:1", 1, &enabled(&[1])).unwrap_err();
        assert_eq!(
            err,
            MapError::UnknownPort {
                port: 3,
                available: 1
            }
        );
    }

    #[test]
    fn rejects_an_empty_core_list() {
        let err = PortCoreMap::parse("0:", 1, &enabled(&[1])).unwrap_err();
        assert!(matches!(err, MapError::Malformed { .. }) || matches!(err, MapError::EmptyCoreList { .. }));
    }

    #[test]
    fn rejects_too_many_cores_for_a_single_port() {
        let cores: Vec<usize> = (1..=MAX_CORES_PER_PORT + 1).collect();
        let mapping = format!("0:{}", cores.iter().map(usize::to_string).collect::<Vec<_>>().join(","));
        let err = PortCoreMap::parse(&mapping, 1, &enabled(&cores)).unwrap_err();
        assert_eq!(
            err,
            MapError::TooManyCoresForPort {
                port: 0,
                requested: MAX_CORES_PER_PORT + 1
            }
        );
    }

    #[test]
    fn rejects_a_core_overcommitted_across_ports() {
        let mapping = "0:1 1:1 2:1 3:1 4:1";
        let err = PortCoreMap::parse(mapping, 5, &enabled(&[1])).unwrap_err();
        assert_eq!(
            err,
            MapError::CoreQueueBudgetExceeded {
                core: 1,
                assigned: MAX_QUEUES_PER_CORE + 1
            }
        );
    }

    #[test]
    fn a_core_serving_multiple_queues_sees_every_task() {
        let map = PortCoreMap::parse("0:1 1:1", 2, &enabled(&[1])).unwrap();
        let tasks = &map.core_work(1).unwrap().tasks;
        assert_eq!(tasks.len(), 2);
        assert!(tasks.contains(&(0, 0)));
        assert!(tasks.contains(&(1, 0)));
    }
}
