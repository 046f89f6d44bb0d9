//! Capacity summary tables, grouped by technology.
use crate::id::SiteID;
use crate::results::{CapacityPair, ProcessCapacity, StorageCapacity};
use indexmap::IndexMap;
use std::rc::Rc;

/// Capacities at or below this value are not reported
pub const CAPACITY_THRESHOLD: f64 = 0.1;

/// Power and energy capacity of a storage technology
#[derive(Debug, Clone, Copy, Default, PartialEq, derive_more::Add)]
pub struct StorageCapacityTotals {
    /// Power (charge/discharge) capacity
    pub power: CapacityPair,
    /// Energy (content) capacity
    pub energy: CapacityPair,
}

/// Capacities grouped by technology name, ordered by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityTables {
    /// Power capacity of each process
    pub processes: IndexMap<Rc<str>, CapacityPair>,
    /// Capacities of each storage
    pub storages: IndexMap<Rc<str>, StorageCapacityTotals>,
}

impl CapacityTables {
    /// Whether there is nothing to report
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty() && self.storages.is_empty()
    }
}

/// Sum values with the same name and sort by name
fn group_by_name<T, I>(items: I) -> IndexMap<Rc<str>, T>
where
    T: Copy + Default + std::ops::Add<Output = T>,
    I: IntoIterator<Item = (Rc<str>, T)>,
{
    let mut groups: IndexMap<Rc<str>, T> = IndexMap::new();
    for (name, value) in items {
        let total = groups.entry(name).or_default();
        *total = *total + value;
    }
    groups.sort_keys();

    groups
}

/// Sum process capacities by process name, optionally only for one site
pub fn group_process_capacities(
    capacities: &[ProcessCapacity],
    site: Option<&SiteID>,
) -> IndexMap<Rc<str>, CapacityPair> {
    group_by_name(
        capacities
            .iter()
            .filter(|cap| site.is_none_or(|site| cap.site == *site))
            .map(|cap| (cap.process.clone(), cap.power)),
    )
}

/// Sum storage capacities by storage name, optionally only for one site
pub fn group_storage_capacities(
    capacities: &[StorageCapacity],
    site: Option<&SiteID>,
) -> IndexMap<Rc<str>, StorageCapacityTotals> {
    group_by_name(
        capacities
            .iter()
            .filter(|cap| site.is_none_or(|site| cap.site == *site))
            .map(|cap| {
                let totals = StorageCapacityTotals {
                    power: cap.power,
                    energy: cap.energy,
                };
                (cap.storage.clone(), totals)
            }),
    )
}

/// Build the capacity tables for a report.
///
/// Capacities are grouped by technology, then technologies named in `exclude` and those with
/// capacity at or below [`CAPACITY_THRESHOLD`] are removed. Absent tables give empty groups.
pub fn aggregate_capacities(
    processes: Option<&[ProcessCapacity]>,
    storages: Option<&[StorageCapacity]>,
    site: Option<&SiteID>,
    exclude: &[String],
) -> CapacityTables {
    let is_excluded = |name: &str| exclude.iter().any(|excluded| excluded == name);

    let mut processes = processes
        .map(|caps| group_process_capacities(caps, site))
        .unwrap_or_default();
    processes.retain(|name, cap| !is_excluded(name) && cap.total > CAPACITY_THRESHOLD);

    let mut storages = storages
        .map(|caps| group_storage_capacities(caps, site))
        .unwrap_or_default();
    storages.retain(|name, cap| !is_excluded(name) && cap.energy.total > CAPACITY_THRESHOLD);

    CapacityTables {
        processes,
        storages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{process_capacities, storage_capacities};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_grouping_conserves_sums(process_capacities: Vec<ProcessCapacity>) {
        let grouped = group_process_capacities(&process_capacities, None);

        let raw_total: f64 = process_capacities.iter().map(|cap| cap.power.total).sum();
        let raw_new: f64 = process_capacities.iter().map(|cap| cap.power.new).sum();
        let grouped_total: f64 = grouped.values().map(|cap| cap.total).sum();
        let grouped_new: f64 = grouped.values().map(|cap| cap.new).sum();
        assert_approx_eq!(f64, raw_total, grouped_total);
        assert_approx_eq!(f64, raw_new, grouped_new);

        // Ordered by name
        let names: Vec<_> = grouped.keys().map(|name| name.to_string()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[rstest]
    fn test_grouping_by_site(process_capacities: Vec<ProcessCapacity>) {
        let grouped = group_process_capacities(&process_capacities, Some(&"North".into()));
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["Gas plant"], CapacityPair::new(30.0, 0.0).unwrap());
        assert_eq!(grouped["Hydro plant"], CapacityPair::new(200.0, 20.0).unwrap());

        let grouped = group_process_capacities(&process_capacities, None);
        assert_eq!(grouped["Gas plant"], CapacityPair::new(130.0, 0.0).unwrap());
    }

    #[rstest]
    fn test_aggregate_capacities_filters(
        process_capacities: Vec<ProcessCapacity>,
        storage_capacities: Vec<StorageCapacity>,
    ) {
        let tables = aggregate_capacities(
            Some(process_capacities.as_slice()),
            Some(storage_capacities.as_slice()),
            None,
            &["Slack powerplant".to_string()],
        );

        for (name, cap) in &tables.processes {
            assert!(cap.total > CAPACITY_THRESHOLD, "{name}");
            assert!(cap.total >= cap.new && cap.new >= 0.0);
        }
        assert!(!tables.processes.contains_key("Slack powerplant"));
        assert!(!tables.processes.contains_key("Wind park")); // below threshold
        assert!(tables.processes.contains_key("Photovoltaics"));

        assert_eq!(tables.storages.len(), 1);
        let battery = tables.storages["Battery"];
        assert_eq!(battery.energy, CapacityPair::new(400.0, 100.0).unwrap());
        assert_eq!(battery.power, CapacityPair::new(100.0, 25.0).unwrap());
    }

    #[test]
    fn test_aggregate_capacities_absent() {
        let tables = aggregate_capacities(None, None, None, &[]);
        assert!(tables.is_empty());
    }
}
