#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use ember_ecs::{App, ClassOptions, Component, ComponentId, Context, Entity, Event, System, SystemInfo};

/// `(class, hook, entity)` records shared by every probe of a test.
pub type Log = Rc<RefCell<Vec<(&'static str, &'static str, Entity)>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn count(log: &Log, class: &str, hook: &str) -> usize {
    log.borrow()
        .iter()
        .filter(|(c, h, _)| *c == class && *h == hook)
        .count()
}

pub fn count_on(log: &Log, hook: &str, entity: Entity) -> usize {
    log.borrow()
        .iter()
        .filter(|(_, h, e)| *h == hook && *e == entity)
        .count()
}

pub fn hooks(log: &Log) -> Vec<&'static str> {
    log.borrow().iter().map(|(_, h, _)| *h).collect()
}

/// Component that records every hook it receives.
pub struct Probe {
    pub class: &'static str,
    pub log: Log,
    pub value: i32,
}

impl Component for Probe {
    fn on_init(&mut self, cx: &mut Context<'_>) {
        self.log.borrow_mut().push((self.class, "init", cx.entity()));
    }

    fn on_enable(&mut self, cx: &mut Context<'_>) {
        self.log.borrow_mut().push((self.class, "enable", cx.entity()));
    }

    fn on_disable(&mut self, cx: &mut Context<'_>) {
        self.log.borrow_mut().push((self.class, "disable", cx.entity()));
    }

    fn on_destroy(&mut self, cx: &mut Context<'_>) {
        self.log.borrow_mut().push((self.class, "destroy", cx.entity()));
    }

    fn on_clone(&mut self, source: &dyn Component, cx: &mut Context<'_>) {
        if let Some(src) = source.downcast_ref::<Probe>() {
            self.value = src.value;
        }
        self.log.borrow_mut().push((self.class, "clone", cx.entity()));
    }

    fn on_event(&mut self, handler: &str, _event: &Event, cx: &mut Context<'_>) {
        let hook = match handler {
            "on_foo" => "on_foo",
            "on_bar" => "on_bar",
            _ => "on_other",
        };
        self.log.borrow_mut().push((self.class, hook, cx.entity()));
    }
}

/// Register a [`Probe`] class writing to `log`.
pub fn probe_class(app: &mut App, log: &Log, class: &'static str, options: ClassOptions) {
    let log = log.clone();
    app.register_class_with(
        class,
        move || Probe {
            class,
            log: log.clone(),
            value: 0,
        },
        options,
    );
}

/// System that records every call as `"<id>:<hook>"`.
pub struct Recorder {
    pub id: &'static str,
    pub calls: Rc<RefCell<Vec<String>>>,
    pub tracked: Vec<(Entity, ComponentId)>,
    pub reserved: usize,
}

impl Recorder {
    pub fn new(id: &'static str, calls: &Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            id,
            calls: calls.clone(),
            tracked: Vec::new(),
            reserved: 0,
        }
    }

    fn record(&self, hook: &str) {
        self.calls.borrow_mut().push(format!("{}:{hook}", self.id));
    }
}

impl System for Recorder {
    fn finalize(&mut self, info: &SystemInfo) {
        self.reserved = info.pool_size;
        self.record("finalize");
    }

    fn add(&mut self, entity: Entity, component: ComponentId) {
        self.tracked.push((entity, component));
        self.record("add");
    }

    fn remove(&mut self, _entity: Entity, component: ComponentId) {
        self.tracked.retain(|(_, c)| *c != component);
        self.record("remove");
    }

    fn tick(&mut self, _app: &mut App) {
        self.record("tick");
    }

    fn post_tick(&mut self, _app: &mut App) {
        self.record("post_tick");
    }
}

pub fn calls() -> Rc<RefCell<Vec<String>>> {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn call_count(calls: &Rc<RefCell<Vec<String>>>, call: &str) -> usize {
    calls.borrow().iter().filter(|c| *c == call).count()
}
