//! The process-wide registry is set up exactly once.
//!
//! Kept in its own test binary: the registry cannot be reset once built.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use oxide_store::{bindings, StoreError, TableFieldDescriptor};
use oxide_store_derive::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CityField {
    Id,
    Name,
}

#[derive(Debug, Default, Entity)]
#[storage(key = CityField)]
struct City {
    #[primary_key]
    id: i64,
    name: String,
}

static SETUP_RUNS: AtomicUsize = AtomicUsize::new(0);

fn setup(builder: &mut bindings::RegistryBuilder) -> oxide_store::StoreResult<()> {
    SETUP_RUNS.fetch_add(1, Ordering::SeqCst);
    builder.register::<City, _>(
        "City",
        [
            TableFieldDescriptor::new(CityField::Id, "id")?,
            TableFieldDescriptor::new(CityField::Name, "name")?,
        ],
    )?;
    Ok(())
}

#[test]
fn test_initialize_runs_setup_once() {
    assert!(matches!(
        bindings::global().err().unwrap(),
        StoreError::RegistryNotInitialized
    ));

    // A failing setup leaves the registry uninitialized.
    let err = bindings::initialize(|_| Err(StoreError::InvalidDescriptor("boom".into())))
        .err()
        .unwrap();
    assert!(matches!(err, StoreError::InvalidDescriptor(_)));
    assert!(bindings::global().is_err());

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                bindings::initialize(setup).unwrap()
            })
        })
        .collect();
    let registries: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(SETUP_RUNS.load(Ordering::SeqCst), 1);
    assert!(registries.iter().all(|r| Arc::ptr_eq(r, &registries[0])));

    let global = bindings::global().unwrap();
    assert!(Arc::ptr_eq(&global, &registries[0]));
    assert_eq!(global.binding::<City>().unwrap().table_name(), "City");

    // Later calls return the existing registry without running their setup.
    let again = bindings::initialize(|_| panic!("setup must not run twice")).unwrap();
    assert!(Arc::ptr_eq(&again, &global));
}
