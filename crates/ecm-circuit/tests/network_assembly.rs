//! Integration tests for tree traversal and equation assembly.

use ecm_circuit::{CircuitElement, CircuitError, Leaf, SystemContext};
use ecm_core::{Real, SystemKind, ValueSource};
use ecm_system::{
    DifferentialAlgebraicReducer, EquationSystemKind, StateSystemGroup, SystemError, select,
};
use nalgebra::DVector;
use proptest::prelude::*;

fn resistor(r: Real) -> CircuitElement {
    Leaf::ohmic(ValueSource::constant(r)).into()
}

/// Run the attach phase and push `current` into the root.
fn attach(root: &mut CircuitElement, current: Real) -> StateSystemGroup {
    let mut group = StateSystemGroup::new();
    root.set_system(&mut SystemContext::new(&mut group)).unwrap();
    group.initialize().unwrap();
    root.set_initial_current(&SystemContext::new(&mut group), current)
        .unwrap();
    group
}

/// One assembly pass; returns the terminal voltage row.
fn assemble(root: &mut CircuitElement, group: &mut StateSystemGroup) -> ecm_system::RowVector {
    group.reset_system();
    let mut ctx = SystemContext::new(group);
    root.get_voltage(&mut ctx).unwrap().clone()
}

fn series_of(n: usize, r: Real) -> CircuitElement {
    let mut root = CircuitElement::serial();
    for _ in 0..n {
        root.add_child(resistor(r)).unwrap();
    }
    root
}

#[test]
fn series_resistors_sum() {
    let mut root = series_of(4, 2.5);
    let mut group = attach(&mut root, 3.0);
    let v = assemble(&mut root, &mut group);
    assert_eq!(v.len(), 1);
    assert!((v[0] - 30.0).abs() < 1e-12);
}

proptest! {
    #[test]
    fn series_voltage_scales_with_count_and_current(
        n in 1usize..12,
        current in -50.0..50.0f64,
        r in 1e-3..100.0f64,
    ) {
        let mut root = series_of(n, r);
        let mut group = attach(&mut root, current);
        let v = assemble(&mut root, &mut group);
        let expected = n as Real * current * r;
        prop_assert!((v[0] - expected).abs() <= 1e-9 * expected.abs().max(1.0));
    }
}

#[test]
fn parallel_branch_uids_come_after_children() {
    let mut root = CircuitElement::parallel()
        .with_child(Leaf::capacity(ValueSource::constant(1.0)))
        .unwrap()
        .with_child(resistor(1.0))
        .unwrap()
        .with_child(Leaf::parallel_rc(
            ValueSource::constant(1.0),
            ValueSource::constant(1.0),
        ))
        .unwrap();
    let group = attach(&mut root, 1.0);

    assert_eq!(group.diff_count(), 2);
    assert_eq!(group.alg_count(), 2);
    let ecm_circuit::ElementKind::Parallel(p) = root.kind() else {
        panic!("expected a parallel composite");
    };
    let uids = p.branch_uids();
    assert_eq!(uids.len(), 2);
    assert!(uids.iter().all(|u| u.kind() == SystemKind::Algebraic));
    assert_eq!(uids[0].index(), 0);
    assert_eq!(uids[1].index(), 1);
}

#[test]
fn parallel_current_mapping() {
    let mut root = CircuitElement::parallel();
    for r in [1.0, 2.0, 3.0] {
        root.add_child(resistor(r)).unwrap();
    }
    let group = attach(&mut root, 6.0);
    // columns: a0 = 0, a1 = 1, affine = 2
    let first = root.at(0).unwrap().current_vector();
    assert_eq!(first.as_slice(), &[-1.0, -1.0, 6.0]);
    assert_eq!(root.at(1).unwrap().current_vector().as_slice(), &[1.0, 0.0, 0.0]);
    assert_eq!(root.at(2).unwrap().current_vector().as_slice(), &[0.0, 1.0, 0.0]);
    assert_eq!(group.width(), 3);
}

#[test]
fn parallel_resistors_share_voltage() {
    for k in 1..=4usize {
        let resistances: Vec<Real> = (1..=k).map(|i| i as Real).collect();
        let mut root = CircuitElement::parallel();
        for &r in &resistances {
            root.add_child(resistor(r)).unwrap();
        }
        let current = 2.0;
        let mut group = attach(&mut root, current);
        assemble(&mut root, &mut group);
        assert_eq!(group.alg_count(), k - 1);
        assert_eq!(select(&group), EquationSystemKind::Algebraic);

        let reducer = DifferentialAlgebraicReducer::new(&group).unwrap();
        let x_a = reducer.algebraic_states(&DVector::zeros(0));
        group.set_algebraic_states(&x_a).unwrap();
        root.calculate_state_dependent_values(&SystemContext::new(&mut group))
            .unwrap();

        let conductance: Real = resistances.iter().map(|r| 1.0 / r).sum();
        let node = current / conductance;
        assert!((root.voltage_value() - node).abs() < 1e-12, "k={k}");
        assert!((root.current_value() - current).abs() < 1e-12);

        let mut total = 0.0;
        for (i, &r) in resistances.iter().enumerate() {
            let child = root.at(i).unwrap();
            assert!((child.voltage_value() - node).abs() < 1e-12, "k={k} branch {i}");
            assert!((child.current_value() - node / r).abs() < 1e-12);
            total += child.current_value();
        }
        assert!((total - current).abs() < 1e-12);
    }
}

#[test]
fn parallel_capacitors_are_singular() {
    let c = ValueSource::constant;
    let mut root = CircuitElement::parallel()
        .with_child(Leaf::capacity(c(1.0)))
        .unwrap()
        .with_child(Leaf::capacity(c(2.0)))
        .unwrap();
    let mut group = attach(&mut root, 1.0);
    assemble(&mut root, &mut group);
    assert_eq!(
        select(&group),
        EquationSystemKind::DifferentialAlgebraic
    );
    assert!(matches!(
        DifferentialAlgebraicReducer::new(&group),
        Err(SystemError::SingularAlgebraicBlock { size: 1 })
    ));
}

#[test]
fn rc_rate_equation() {
    let c = ValueSource::constant;
    let mut root = CircuitElement::serial()
        .with_child(resistor(0.5))
        .unwrap()
        .with_child(Leaf::parallel_rc(c(10.0), c(1.0)))
        .unwrap();
    let mut group = attach(&mut root, 4.0);
    let v = assemble(&mut root, &mut group);
    // dV/dt = I·R/τ - V/τ
    let a = group.differential().matrix();
    assert_eq!(a[(0, 0)], -1.0);
    assert_eq!(group.differential().constants()[0], 40.0);
    // terminal = V_rc + 0.5·I
    assert_eq!(v.as_slice(), &[1.0, 2.0]);
    assert_eq!(select(&group), EquationSystemKind::Differential);
}

#[test]
fn assembly_is_deterministic() {
    let c = ValueSource::constant;
    let zarc = ecm_circuit::Zarc::new(c(1e-2), c(0.02), c(0.8), 1e-4).unwrap();
    let inner = CircuitElement::parallel()
        .with_child(Leaf::parallel_rc(c(0.1), c(1.0)))
        .unwrap()
        .with_child(resistor(0.2))
        .unwrap();
    let mut root = CircuitElement::serial()
        .with_child(resistor(0.01))
        .unwrap()
        .with_child(inner)
        .unwrap()
        .with_child(Leaf::Zarc(zarc))
        .unwrap()
        .with_child(Leaf::capacity(c(100.0)))
        .unwrap();
    let mut group = attach(&mut root, 1.5);

    let first_v = assemble(&mut root, &mut group);
    let first = (
        group.differential().matrix().clone(),
        group.algebraic().matrix().clone(),
        group.differential().constants().clone(),
    );
    let second_v = assemble(&mut root, &mut group);
    assert_eq!(first_v, second_v);
    assert_eq!(&first.0, group.differential().matrix());
    assert_eq!(&first.1, group.algebraic().matrix());
    assert_eq!(&first.2, group.differential().constants());
}

#[test]
fn assembly_without_reset_accumulates() {
    let c = ValueSource::constant;
    let mut root = CircuitElement::serial()
        .with_child(Leaf::capacity(c(2.0)))
        .unwrap();
    let mut group = attach(&mut root, 1.0);
    assemble(&mut root, &mut group);
    assert_eq!(group.differential().constants()[0], 0.5);
    let mut ctx = SystemContext::new(&mut group);
    root.get_voltage(&mut ctx).unwrap();
    assert_eq!(group.differential().constants()[0], 1.0);
}

#[test]
fn observable_composite_reports_its_values() {
    let inner = CircuitElement::serial()
        .observable(true)
        .with_child(resistor(2.0))
        .unwrap();
    let mut root = CircuitElement::serial()
        .with_child(inner)
        .unwrap()
        .with_child(resistor(3.0))
        .unwrap();
    let mut group = attach(&mut root, 1.0);
    assemble(&mut root, &mut group);
    root.calculate_state_dependent_values(&SystemContext::new(&mut group))
        .unwrap();
    let inner = root.at(0).unwrap();
    assert_eq!(inner.voltage_value(), 2.0);
    assert_eq!(inner.current_value(), 1.0);
    assert_eq!(root.voltage_value(), 5.0);
    assert_eq!(root.power_value(), 5.0);
}

#[test]
fn display_only_leaves_fail_assembly() {
    let c = ValueSource::constant;
    let mut root = CircuitElement::serial()
        .with_child(Leaf::Inductance(ecm_circuit::Inductance::new(c(1e-6))))
        .unwrap();
    let mut group = attach(&mut root, 1.0);
    group.reset_system();
    let err = root
        .get_voltage(&mut SystemContext::new(&mut group))
        .unwrap_err();
    assert!(matches!(err, CircuitError::NotSimulatable { .. }));
}

#[test]
fn voltage_source_sets_affine_slot() {
    let c = ValueSource::constant;
    let mut root = CircuitElement::serial()
        .with_child(Leaf::voltage_source(c(3.7)))
        .unwrap()
        .with_child(resistor(0.1))
        .unwrap();
    let mut group = attach(&mut root, -2.0);
    let v = assemble(&mut root, &mut group);
    assert!((v[0] - 3.5).abs() < 1e-12);
}
