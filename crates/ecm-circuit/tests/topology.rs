//! Integration tests for tree construction errors and the cell element.

use ecm_circuit::{CellState, CircuitElement, CircuitError, Leaf, Soc, SystemContext};
use ecm_core::{Real, StateCell, ValueSource};
use ecm_system::{StateSystemGroup, SystemError};

fn resistor(r: Real) -> CircuitElement {
    Leaf::ohmic(ValueSource::constant(r)).into()
}

fn cell(capacity_ah: Real, soc: Real) -> CircuitElement {
    let state = CellState::new(Soc::new(capacity_ah, soc).unwrap(), StateCell::new(25.0));
    CircuitElement::cell(state)
}

#[test]
fn at_out_of_range_for_every_kind() {
    let mut elements = vec![
        CircuitElement::serial(),
        CircuitElement::parallel(),
        cell(1.0, 50.0),
    ];
    for element in &mut elements {
        element.add_child(resistor(1.0)).unwrap();
        element.add_child(resistor(2.0)).unwrap();
        assert!(element.at(1).is_ok());
        assert!(matches!(
            element.at(2),
            Err(CircuitError::IndexOutOfRange {
                index: 2,
                len: 2,
                ..
            })
        ));
        assert!(matches!(
            element.at_mut(5),
            Err(CircuitError::IndexOutOfRange { .. })
        ));
    }

    let leaf = resistor(1.0);
    assert!(matches!(
        leaf.at(0),
        Err(CircuitError::IndexOutOfRange { len: 0, .. })
    ));
}

#[test]
fn children_only_on_composites() {
    let mut leaf = resistor(1.0);
    assert!(matches!(
        leaf.add_child(resistor(1.0)),
        Err(CircuitError::InvalidTopology { .. })
    ));
    assert_eq!(leaf.child_count(), 0);

    let nested = CircuitElement::serial()
        .with_child(CircuitElement::parallel().with_child(resistor(1.0)).unwrap())
        .unwrap();
    assert_eq!(nested.child_count(), 1);
    assert_eq!(nested.at(0).unwrap().child_count(), 1);
}

#[test]
fn initialize_twice_fails() {
    let mut root = CircuitElement::serial()
        .with_child(Leaf::capacity(ValueSource::constant(1.0)))
        .unwrap();
    let mut group = StateSystemGroup::new();
    root.set_system(&mut SystemContext::new(&mut group)).unwrap();
    group.initialize().unwrap();
    assert!(matches!(
        group.initialize(),
        Err(SystemError::AlreadyInitialized { .. })
    ));
    // no more UIDs once the widths are fixed
    assert!(matches!(
        root.set_system(&mut SystemContext::new(&mut group)),
        Err(CircuitError::System(SystemError::AlreadyInitialized { .. }))
    ));
}

#[test]
fn cell_integrates_soc_and_heat() {
    let mut root = cell(1.0, 50.0)
        .with_child(resistor(0.1))
        .unwrap();
    let mut group = StateSystemGroup::new();
    root.set_system(&mut SystemContext::new(&mut group)).unwrap();
    group.initialize().unwrap();
    group.set_dt(0.5).unwrap();
    root.set_initial_current(&SystemContext::new(&mut group), 0.0)
        .unwrap();

    root.set_current_value(2.0).unwrap();
    group.reset_system();
    let mut ctx = SystemContext::new(&mut group);
    root.get_voltage(&mut ctx).unwrap();
    root.calculate_state_dependent_values(&ctx).unwrap();

    let state = root.cell_state().unwrap();
    assert_eq!(state.soc().charge(), 1800.0 + 1.0);
    assert!((state.dissipated_energy() - 0.2).abs() < 1e-15);
    assert!((root.voltage_value() - 0.2).abs() < 1e-15);
    assert_eq!(root.name(), "CellElement");
}

#[test]
fn soc_drives_bound_lookup() {
    let state = CellState::new(Soc::new(1.0, 0.0).unwrap(), StateCell::new(25.0));
    let table = ecm_core::Lookup1D::new(vec![0.0, 100.0], vec![3.0, 4.2]).unwrap();
    let ocv = ValueSource::lookup_1d(table, state.soc().state());
    let mut root = CircuitElement::cell(state)
        .with_child(Leaf::voltage_source(ocv.clone()))
        .unwrap();

    assert!((ocv.value().unwrap() - 3.0).abs() < 1e-12);
    root.cell_state_mut()
        .unwrap()
        .soc_mut()
        .set_charge(1800.0);
    assert!((ocv.value().unwrap() - 3.6).abs() < 1e-12);
}

#[test]
fn set_current_value_only_reaches_first_parallel_branch() {
    let mut root = CircuitElement::parallel()
        .with_child(resistor(1.0))
        .unwrap()
        .with_child(resistor(1.0))
        .unwrap();
    let mut group = StateSystemGroup::new();
    root.set_system(&mut SystemContext::new(&mut group)).unwrap();
    group.initialize().unwrap();
    root.set_initial_current(&SystemContext::new(&mut group), 0.0)
        .unwrap();
    root.set_current_value(3.0).unwrap();

    assert_eq!(root.current_vector()[1], 3.0);
    assert_eq!(root.at(0).unwrap().current_vector()[1], 3.0);
    assert_eq!(root.at(1).unwrap().current_vector()[1], 0.0);
}
