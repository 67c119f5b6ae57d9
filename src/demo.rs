//! A small scene exercising the lifecycle core: agents move every frame,
//! take damage through entity events and are destroyed when they run out
//! of health.

use ember_ecs::{
    App, ClassOptions, Component, ComponentId, Context, Entity, Event, System, SystemDescriptor,
    SystemInfo,
};
use tracing::{debug, info};

use crate::settings::DemoSettings;

pub const MOVER: &str = "Mover";
pub const AGENT: &str = "Agent";
pub const HEALTH: &str = "Health";
pub const DAMAGE: &str = "damage";

#[derive(Debug, Default)]
pub struct Mover {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
}

impl Component for Mover {
    fn on_clone(&mut self, source: &dyn Component, _cx: &mut Context<'_>) {
        if let Some(src) = source.downcast_ref::<Mover>() {
            self.position = src.position;
            self.velocity = src.velocity;
        }
    }
}

/// A mover that announces itself.
#[derive(Debug, Default)]
pub struct Agent {
    pub mover: Mover,
}

impl Component for Agent {
    fn on_enable(&mut self, cx: &mut Context<'_>) {
        let name = cx.name(cx.entity()).unwrap_or_default().to_string();
        debug!(agent = %name, "agent enabled");
    }

    fn on_destroy(&mut self, cx: &mut Context<'_>) {
        debug!(entity = %cx.entity(), "agent destroyed");
    }
}

#[derive(Debug)]
pub struct Health {
    pub hp: i32,
}

impl Default for Health {
    fn default() -> Self {
        Self { hp: 5 }
    }
}

impl Component for Health {
    fn on_clone(&mut self, source: &dyn Component, _cx: &mut Context<'_>) {
        if let Some(src) = source.downcast_ref::<Health>() {
            self.hp = src.hp;
        }
    }

    fn on_event(&mut self, handler: &str, event: &Event, cx: &mut Context<'_>) {
        if handler != "on_damage" {
            return;
        }
        self.hp -= event.detail::<i32>().copied().unwrap_or(1);
        if self.hp <= 0 {
            let entity = cx.entity();
            cx.destroy(entity);
        }
    }
}

/// Integrates positions of every `Mover` (agents included).
#[derive(Default)]
pub struct MovementSystem {
    tracked: Vec<(Entity, ComponentId)>,
}

impl System for MovementSystem {
    fn finalize(&mut self, info: &SystemInfo) {
        self.tracked.reserve(info.pool_size);
    }

    fn add(&mut self, entity: Entity, component: ComponentId) {
        self.tracked.push((entity, component));
    }

    fn remove(&mut self, _entity: Entity, component: ComponentId) {
        self.tracked.retain(|(_, c)| *c != component);
    }

    fn tick(&mut self, app: &mut App) {
        for (_, c) in &self.tracked {
            if app.is_comp_destroyed(*c) || !app.is_comp_enabled(*c) {
                continue;
            }
            if let Some(agent) = app.get_mut::<Agent>(*c) {
                step(&mut agent.mover);
            } else if let Some(mover) = app.get_mut::<Mover>(*c) {
                step(mover);
            }
        }
    }

    fn post_tick(&mut self, _app: &mut App) {}
}

fn step(mover: &mut Mover) {
    mover.position[0] += mover.velocity[0];
    mover.position[1] += mover.velocity[1];
}

/// Deals one point of damage to every tracked entity per frame.
#[derive(Default)]
pub struct DecaySystem {
    tracked: Vec<Entity>,
}

impl System for DecaySystem {
    fn finalize(&mut self, info: &SystemInfo) {
        self.tracked.reserve(info.pool_size);
    }

    fn add(&mut self, entity: Entity, _component: ComponentId) {
        self.tracked.push(entity);
    }

    fn remove(&mut self, entity: Entity, _component: ComponentId) {
        self.tracked.retain(|e| *e != entity);
    }

    fn tick(&mut self, app: &mut App) {
        for entity in &self.tracked {
            app.dispatch(*entity, Event::new(DAMAGE).with_detail(1i32));
        }
    }

    fn post_tick(&mut self, _app: &mut App) {}
}

pub fn systems() -> Vec<SystemDescriptor> {
    vec![
        SystemDescriptor::new("movement", MovementSystem::default(), MOVER, 0),
        SystemDescriptor::new("decay", DecaySystem::default(), HEALTH, 10),
    ]
}

pub fn register_classes(app: &mut App, settings: &DemoSettings) {
    let health = settings.health;
    app.register_class::<Mover>(MOVER, ClassOptions::new());
    app.register_class_with(HEALTH, move || Health { hp: health }, ClassOptions::new().event(DAMAGE, "on_damage"));
    app.register_class::<Agent>(AGENT, ClassOptions::new().extends(MOVER).requires(HEALTH));
}

/// Build the scene: a squad of agents, plus one deep copy of the squad.
pub fn populate(app: &mut App, settings: &DemoSettings) -> Entity {
    let squad = app.create_entity("squad");
    for i in 0..settings.agents {
        let Some(agent) = app.create_entity_in(format!("agent-{i}"), squad) else {
            continue;
        };
        if let Some(c) = app.add_comp(agent, AGENT) {
            if let Some(a) = app.get_mut::<Agent>(c) {
                a.mover.velocity = [1.0, i as f32 * 0.5];
            }
        }
    }
    app.deep_clone_entity(squad);
    squad
}

pub fn run(app: &mut App, settings: &DemoSettings) {
    for _ in 0..settings.frames {
        app.tick();
        info!(
            frame = app.frame(),
            live = app.entity_count(),
            "frame done"
        );
    }
}
