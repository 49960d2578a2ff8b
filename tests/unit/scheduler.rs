use super::*;

#[test]
fn plan_prefixes_task_names_by_kind() {
    let mut plan = Plan::new();
    plan.gl("bg", |_, _| Ok(()))
        .cl("flow", |_, _| Ok(()))
        .clgl("blur", |_, _| Ok(()))
        .cpu("stats", |_| Ok(()))
        .nvg("hud", |_, _, _| {});
    let names: Vec<&str> = plan.tasks().iter().map(Task::name).collect();
    assert_eq!(names, ["gl:bg", "cl:flow", "clgl:blur", "cpu:stats", "nvg:hud"]);
    let gl: Vec<bool> = plan.tasks().iter().map(Task::needs_gl).collect();
    assert_eq!(gl, [true, false, true, false, true]);
}

#[test]
fn storage_buffers_are_reused_across_ticks() {
    let mut table = StorageTable::new();
    let size = Size::new(16, 8);
    let ptr = {
        let mut s = table.view("clgl:blur", 0);
        let b = s.buffer("tmp", size, PixelFormat::Bgra8);
        b.data_mut()[0] = 42;
        b.data().as_ptr()
    };
    let mut s = table.view("clgl:blur", 1);
    let b = s.buffer("tmp", size, PixelFormat::Bgra8);
    assert_eq!(b.data().as_ptr(), ptr);
    assert_eq!(b.data()[0], 42);
    assert_eq!(s.frame(), 1);
}

#[test]
fn storage_is_namespaced_per_task() {
    let mut table = StorageTable::new();
    table
        .view("cpu:a", 0)
        .buffer("tmp", Size::new(1, 1), PixelFormat::Gray8)
        .data_mut()[0] = 7;
    let s = table.view("cpu:b", 0);
    assert!(s.get_buffer("tmp").is_none());
    assert_eq!(table.buffer("cpu:a", "tmp").map(|b| b.data()[0]), Some(7));
    assert_eq!(table.buffer_count(), 1);
}

#[test]
fn storage_values_persist_and_check_types() {
    let mut table = StorageTable::new();
    *table.view("cpu:count", 0).value::<u32>("n").unwrap() += 1;
    *table.view("cpu:count", 1).value::<u32>("n").unwrap() += 1;
    assert_eq!(*table.view("cpu:count", 2).value::<u32>("n").unwrap(), 2);
    assert!(table.view("cpu:count", 3).value::<String>("n").is_err());
}
