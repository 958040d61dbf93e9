// Host callables that call back into the table they are serving.
//
// Invariants exercised:
// - A callback may read the table it runs inside (len, count, find).
// - A callback that tries to mutate that table gets `Error::Reentrant`,
//   and the outer operation still completes consistently.
// - A callback may freely mutate a *different* table.
// - Turning tracing on has no functional effect.
use host_hashmap::simple::{self, Value};
use host_hashmap::{set_trace, trace_enabled, Error, Find, Registry, Table, TableConfig, TableId};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Slot = Rc<RefCell<Option<Table<Value>>>>;

fn hash_calling(target: Slot, log: Rc<RefCell<Vec<String>>>) -> Value {
    let busy = Rc::new(Cell::new(false));
    Value::func("spy-hash", 1, move |args| {
        // The nested update hashes too; only meddle from the outermost call.
        if busy.replace(true) {
            return simple::hash_of(&args[0]);
        }
        if let Some(t) = target.borrow().as_ref() {
            let len = t.len();
            let write = t.update(Value::Int(999), Value::Int(0));
            log.borrow_mut().push(format!(
                "len_ok={} write={}",
                len.is_ok(),
                match write {
                    Err(Error::Reentrant) => "refused",
                    Err(_) => "error",
                    Ok(_) => "applied",
                }
            ));
        }
        busy.set(false);
        simple::hash_of(&args[0])
    })
}

// Test: re-entrant read allowed, re-entrant write refused.
// Verifies: the outer insert succeeds and the refused write left no trace.
#[test]
fn callback_reads_but_cannot_write_same_table() {
    let slot: Slot = Rc::new(RefCell::new(None));
    let log = Rc::new(RefCell::new(Vec::new()));
    let t = TableConfig::new(hash_calling(slot.clone(), log.clone()), simple::eq_fn())
        .build()
        .unwrap();
    *slot.borrow_mut() = Some(t.clone());

    let (_, added) = t.insert(Value::Int(1), Value::Int(1)).unwrap();
    assert!(added);
    assert_eq!(t.len().unwrap(), 1);
    assert_eq!(t.count(&Value::Int(999)).unwrap(), 0);
    assert!(!log.borrow().is_empty());
    assert!(log
        .borrow()
        .iter()
        .all(|line| line == "len_ok=true write=refused"));

    // Break the table -> hash -> slot -> table cycle.
    *slot.borrow_mut() = None;
}

// Test: swapping the table a callback is serving is a mutation too.
// Verifies: the swap is refused from inside the hash callable, and the
// outer insert lands in the table it was called on.
#[test]
fn callback_cannot_swap_same_table() {
    let slot: Slot = Rc::new(RefCell::new(None));
    let other = TableConfig::new(simple::hash_fn(), simple::eq_fn())
        .build()
        .unwrap();
    let outcome: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
    let (slot2, other2, out2) = (slot.clone(), other.clone(), outcome.clone());
    let hash = Value::func("swapping-hash", 1, move |args| {
        if let Some(t) = slot2.borrow_mut().take() {
            let r = match t.swap(&other2) {
                Err(Error::Reentrant) => "refused",
                Err(_) => "error",
                Ok(()) => "applied",
            };
            *out2.borrow_mut() = Some(r.to_string());
            // The reverse direction borrows the same storages.
            let r = match other2.swap(&t) {
                Err(Error::Reentrant) => "refused",
                _ => "not refused",
            };
            if let Some(s) = out2.borrow_mut().as_mut() {
                s.push_str(r);
            }
        }
        simple::hash_of(&args[0])
    });
    let t = TableConfig::new(hash, simple::eq_fn()).build().unwrap();
    *slot.borrow_mut() = Some(t.clone());

    let (_, added) = t.insert(Value::Int(1), Value::Int(1)).unwrap();
    assert!(added);
    assert_eq!(outcome.borrow().as_deref(), Some("refusedrefused"));
    assert_eq!(t.len().unwrap(), 1);
    assert!(other.is_empty().unwrap());

    // Outside any callback the swap goes through.
    t.swap(&other).unwrap();
    assert_eq!(other.len().unwrap(), 1);
    assert!(t.is_empty().unwrap());
}

// Test: a callback may mutate some other table.
#[test]
fn callback_writes_other_table() {
    let side = TableConfig::new(simple::hash_fn(), simple::eq_fn())
        .build()
        .unwrap();
    let side2 = side.clone();
    let record = Value::func("record", 1, move |args| {
        side2
            .update_with(args[0].clone(), &Value::func("inc", 1, |a| match &a[0] {
                Value::Int(i) => Ok(Value::Int(i + 1)),
                _ => Ok(Value::Int(1)),
            }))
            .map_err(|e| simple::Fault::new(e.to_string()))?;
        Ok(args[0].clone())
    });
    let t = TableConfig::new(simple::hash_fn(), simple::eq_fn())
        .keys_only(true)
        .build()
        .unwrap();
    t.insert_many((0..5).map(Value::Int)).unwrap();

    let out = t.map(&record, Find::Key).unwrap().collect_vec().unwrap();
    assert_eq!(out.len(), 5);
    assert_eq!(side.len().unwrap(), 5);
    assert_eq!(side.get(&Value::Int(3)).unwrap(), Some(Value::Int(1)));
}

// Test: tracing on or off changes nothing observable.
#[test]
fn tracing_is_diagnostic_only() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
    let before = trace_enabled();

    let run = || {
        let t = TableConfig::new(simple::hash_fn(), simple::eq_fn())
            .build()
            .unwrap();
        t.insert(Value::Int(1), Value::Int(1)).unwrap();
        t.update(Value::Int(2), Value::Int(2)).unwrap();
        t.erase(host_hashmap::Erase::Key(Value::Int(1))).unwrap();
        t.to_vec().unwrap()
    };
    set_trace(true);
    let traced = run();
    set_trace(false);
    let quiet = run();
    assert_eq!(traced, quiet);
    set_trace(before);
}

// Test: integer ids resolve while live and never after destroy.
#[test]
fn registry_ids_are_opaque_integers() {
    let mut reg: Registry<Value> = Registry::new();
    let a = reg
        .create(TableConfig::new(simple::hash_fn(), simple::eq_fn()))
        .unwrap();
    let raw = a.to_raw();
    reg.get(TableId::from_raw(raw))
        .unwrap()
        .insert(Value::Int(1), Value::Int(1))
        .unwrap();
    assert_eq!(reg.get(a).unwrap().len().unwrap(), 1);

    reg.destroy(a).unwrap();
    assert!(matches!(reg.get(TableId::from_raw(raw)), Err(Error::InvalidHandle)));
    assert!(reg.is_empty());
}
