//! Rust <-> Lua bridge for gameplay scripting.
//!
//! Scripts never touch the world directly. Every binding writes into the
//! hidden `_jolt` table and Rust drains it in [`LuaBridge::sync`] at a frame
//! boundary:
//!
//!   events.subscribe(name, fn)   -- listener for a named bus event
//!   events.publish(name, table)  -- named event with a flat payload table
//!   ui.on_button(name, fn)       -- handler for a UI `button_callback` name
//!   transform.juice(id, amount)  -- juice impulse on an entity
//!
//! Events the bus delivers to script listeners and button clicks are queued
//! on the Rust side and handed to Lua during the next `sync`, so script code
//! never runs while the world is borrowed.
//!
//! Reload strategy: on file change (mtime polling) or manual trigger (R key),
//! a **fresh Lua state** is created and the script is re-executed from scratch.
//! Bus and UI registrations made on behalf of the old state stay in place and
//! simply find no script listener until the new script subscribes again.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::SystemTime;

use jolt_core::event::{Payload, PayloadValue};
use jolt_core::world::World;
use jolt_core::Entity;
use mlua::prelude::*;

const STATE_TABLE: &str = "_jolt";

/// Status of the Lua runtime for display in the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LuaStatus {
    /// Script loaded and running normally.
    Loaded,
    /// Script had an error; bindings are inert until the next reload.
    Error,
    /// No script file found.
    Fallback,
}

impl LuaStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Loaded => "Lua: loaded",
            Self::Error => "Lua: ERROR",
            Self::Fallback => "Lua: fallback",
        }
    }
}

impl std::fmt::Display for LuaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
enum ScriptSource {
    File(PathBuf),
    Inline { name: String, code: String },
}

/// What one `sync` moved across the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub published: usize,
    pub delivered: usize,
    pub clicks: usize,
    pub juiced: usize,
}

pub struct LuaBridge {
    lua: Lua,
    source: ScriptSource,
    last_modified: Option<SystemTime>,
    status: LuaStatus,
    last_error: Option<String>,
    /// Bus events addressed to script listeners, filled by bus callbacks.
    inbox: Rc<RefCell<Vec<(String, Payload)>>>,
    /// `(callback name, node)` pairs filled by UI callbacks.
    clicks: Rc<RefCell<Vec<(String, Entity)>>>,
    subscribed: HashSet<String>,
    buttons: HashSet<String>,
}

impl LuaBridge {
    /// Create a new LuaBridge. If the script file doesn't exist, starts in Fallback mode.
    pub fn new(script_path: PathBuf) -> Self {
        Self::with_source(ScriptSource::File(script_path))
    }

    /// Runs `code` directly, without a backing file.
    pub fn from_source(name: &str, code: &str) -> Self {
        Self::with_source(ScriptSource::Inline {
            name: name.to_string(),
            code: code.to_string(),
        })
    }

    fn with_source(source: ScriptSource) -> Self {
        let mut bridge = Self {
            lua: Lua::new(),
            source,
            last_modified: None,
            status: LuaStatus::Fallback,
            last_error: None,
            inbox: Rc::new(RefCell::new(Vec::new())),
            clicks: Rc::new(RefCell::new(Vec::new())),
            subscribed: HashSet::new(),
            buttons: HashSet::new(),
        };
        bridge.try_load_script();
        bridge
    }

    pub fn status(&self) -> LuaStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Check if the script file has been modified and reload if needed.
    /// Call this once per frame at a safe boundary (between frames, not mid-step).
    pub fn check_reload(&mut self) {
        let ScriptSource::File(path) = &self.source else {
            return;
        };
        let current_mtime = match std::fs::metadata(path) {
            Ok(meta) => meta.modified().ok(),
            Err(_) => return,
        };

        if current_mtime != self.last_modified {
            log::info!("Lua script changed, reloading: {}", path.display());
            self.try_load_script();
        }
    }

    /// Force a reload of the script (e.g. when user presses R).
    pub fn force_reload(&mut self) {
        log::info!("Lua script force reload");
        self.try_load_script();
    }

    /// Calls the optional global `on_update(dt)`.
    pub fn call_update(&self, dt: f32) {
        if self.status != LuaStatus::Loaded {
            return;
        }
        match self.lua.globals().get::<Option<LuaFunction>>("on_update") {
            Ok(Some(on_update)) => {
                if let Err(err) = on_update.call::<()>(dt) {
                    log::error!("Lua on_update error: {}", err);
                }
            }
            Ok(None) => {}
            Err(err) => log::error!("Lua on_update lookup failed: {}", err),
        }
    }

    /// Applies everything the script asked for since the last call and
    /// delivers queued events and clicks to it.
    pub fn sync(&mut self, world: &mut World, now: f64) -> SyncStats {
        if self.status != LuaStatus::Loaded {
            self.inbox.borrow_mut().clear();
            self.clicks.borrow_mut().clear();
            return SyncStats::default();
        }
        match self.sync_inner(world, now) {
            Ok(stats) => stats,
            Err(err) => {
                let msg = format!("Lua bridge sync failed: {}", err);
                log::error!("{}", msg);
                self.status = LuaStatus::Error;
                self.last_error = Some(msg);
                SyncStats::default()
            }
        }
    }

    fn sync_inner(&mut self, world: &mut World, now: f64) -> LuaResult<SyncStats> {
        let state: LuaTable = self.lua.globals().get(STATE_TABLE)?;
        let mut stats = SyncStats::default();

        for name in drain_sequence::<String>(&state, "new_subscriptions")? {
            if !self.subscribed.insert(name.clone()) {
                continue;
            }
            let inbox = Rc::clone(&self.inbox);
            let event = name.clone();
            world.events.subscribe_named(
                &name,
                Rc::new(move |payload: &Payload| {
                    inbox.borrow_mut().push((event.clone(), payload.clone()));
                }),
            );
            log::debug!("Lua subscribed to '{name}'");
        }

        for name in drain_sequence::<String>(&state, "new_buttons")? {
            if !self.buttons.insert(name.clone()) {
                continue;
            }
            let clicks = Rc::clone(&self.clicks);
            let callback = name.clone();
            world.ui.callbacks_mut().register(
                &name,
                Rc::new(move |entity: Entity| {
                    clicks.borrow_mut().push((callback.clone(), entity));
                }),
            );
            log::debug!("Lua button handler '{name}' registered");
        }

        for request in drain_sequence::<LuaTable>(&state, "juice")? {
            let id: i64 = request.get("id")?;
            let amount: f32 = request.get("amount")?;
            let entity = Entity::from_bits(id as u64);
            if !world.entities.is_alive(entity)
                || !world
                    .transforms
                    .inject_dynamic_motion(entity, now, amount, None, false)
            {
                log::warn!("transform.juice: no live transform for entity {entity}");
                continue;
            }
            stats.juiced += 1;
        }

        for message in drain_sequence::<LuaTable>(&state, "outbox")? {
            let name: String = message.get("name")?;
            let payload = match message.get::<Option<LuaTable>>("payload")? {
                Some(table) => payload_from_table(&table)?,
                None => Payload::new(),
            };
            world.events.publish_named(&name, &payload);
            stats.published += 1;
        }

        let listeners: LuaTable = state.get("listeners")?;
        let inbox: Vec<(String, Payload)> = self.inbox.borrow_mut().drain(..).collect();
        for (name, payload) in inbox {
            let Some(list) = listeners.get::<Option<LuaTable>>(name.as_str())? else {
                continue;
            };
            let table = payload_to_table(&self.lua, &payload)?;
            for listener in list.sequence_values::<LuaFunction>() {
                if let Err(err) = listener?.call::<()>(table.clone()) {
                    log::error!("Lua listener for '{}' failed: {}", name, err);
                }
                stats.delivered += 1;
            }
        }

        let buttons: LuaTable = state.get("buttons")?;
        let clicks: Vec<(String, Entity)> = self.clicks.borrow_mut().drain(..).collect();
        for (name, entity) in clicks {
            let Some(handler) = buttons.get::<Option<LuaFunction>>(name.as_str())? else {
                continue;
            };
            if let Err(err) = handler.call::<()>(entity.to_bits() as i64) {
                log::error!("Lua button handler '{}' failed: {}", name, err);
            }
            stats.clicks += 1;
        }

        Ok(stats)
    }

    fn try_load_script(&mut self) {
        let (name, code) = match &self.source {
            ScriptSource::Inline { name, code } => (name.clone(), code.clone()),
            ScriptSource::File(path) => {
                if !path.exists() {
                    log::warn!("Lua script not found: {}. Scripting disabled.", path.display());
                    self.status = LuaStatus::Fallback;
                    self.last_error = None;
                    self.last_modified = None;
                    return;
                }
                // Record mtime before loading
                self.last_modified = std::fs::metadata(path).ok().and_then(|m| m.modified().ok());
                match std::fs::read_to_string(path) {
                    Ok(code) => (path.to_string_lossy().to_string(), code),
                    Err(err) => {
                        self.fail(format!("Failed to read Lua script: {}", err));
                        return;
                    }
                }
            }
        };

        // Create a fresh Lua state to avoid stale globals
        self.lua = Lua::new();

        if let Err(err) = self.setup_engine_api() {
            self.fail(format!("Failed to setup Lua engine API: {}", err));
            return;
        }

        match self.lua.load(&code).set_name(name.as_str()).exec() {
            Ok(()) => {
                self.status = LuaStatus::Loaded;
                self.last_error = None;
                log::info!("Lua script loaded: {}", name);

                if let Ok(on_init) = self.lua.globals().get::<LuaFunction>("on_init") {
                    if let Err(err) = on_init.call::<()>(()) {
                        log::error!("Lua on_init error: {}", err);
                    }
                }
            }
            Err(err) => self.fail(format!("Lua script load error: {}", err)),
        }
    }

    fn fail(&mut self, msg: String) {
        log::error!("{}", msg);
        self.status = LuaStatus::Error;
        self.last_error = Some(msg);
    }

    /// Builds the `events`, `ui` and `transform` globals and the `_jolt`
    /// queues behind them.
    fn setup_engine_api(&self) -> LuaResult<()> {
        let lua = &self.lua;

        let state = lua.create_table()?;
        for queue in [
            "listeners",
            "new_subscriptions",
            "outbox",
            "buttons",
            "new_buttons",
            "juice",
        ] {
            state.set(queue, lua.create_table()?)?;
        }
        lua.globals().set(STATE_TABLE, state)?;

        let events = lua.create_table()?;
        let subscribe = lua.create_function(|lua_ctx, (name, listener): (String, LuaFunction)| {
            let state: LuaTable = lua_ctx.globals().get(STATE_TABLE)?;
            let listeners: LuaTable = state.get("listeners")?;
            let list = match listeners.get::<Option<LuaTable>>(name.as_str())? {
                Some(list) => list,
                None => {
                    let list = lua_ctx.create_table()?;
                    listeners.set(name.as_str(), list.clone())?;
                    list
                }
            };
            list.push(listener)?;
            state.get::<LuaTable>("new_subscriptions")?.push(name)?;
            Ok(())
        })?;
        events.set("subscribe", subscribe)?;

        let publish = lua.create_function(|lua_ctx, (name, payload): (String, Option<LuaTable>)| {
            let state: LuaTable = lua_ctx.globals().get(STATE_TABLE)?;
            let message = lua_ctx.create_table()?;
            message.set("name", name)?;
            message.set("payload", payload)?;
            state.get::<LuaTable>("outbox")?.push(message)?;
            Ok(())
        })?;
        events.set("publish", publish)?;
        lua.globals().set("events", events)?;

        let ui = lua.create_table()?;
        let on_button = lua.create_function(|lua_ctx, (name, handler): (String, LuaFunction)| {
            let state: LuaTable = lua_ctx.globals().get(STATE_TABLE)?;
            state.get::<LuaTable>("buttons")?.set(name.as_str(), handler)?;
            state.get::<LuaTable>("new_buttons")?.push(name)?;
            Ok(())
        })?;
        ui.set("on_button", on_button)?;
        lua.globals().set("ui", ui)?;

        let transform = lua.create_table()?;
        let juice = lua.create_function(|lua_ctx, (id, amount): (i64, Option<f32>)| {
            let state: LuaTable = lua_ctx.globals().get(STATE_TABLE)?;
            let request = lua_ctx.create_table()?;
            request.set("id", id)?;
            request.set("amount", amount.unwrap_or(0.4))?;
            state.get::<LuaTable>("juice")?.push(request)?;
            Ok(())
        })?;
        transform.set("juice", juice)?;
        lua.globals().set("transform", transform)?;

        Ok(())
    }
}

/// Takes every element of the sequence `state[key]` and leaves it empty.
fn drain_sequence<V: FromLua>(state: &LuaTable, key: &str) -> LuaResult<Vec<V>> {
    let queue: LuaTable = state.get(key)?;
    let items = queue.sequence_values::<V>().collect::<LuaResult<Vec<V>>>()?;
    queue.clear()?;
    Ok(items)
}

fn payload_from_table(table: &LuaTable) -> LuaResult<Payload> {
    let mut payload = Payload::new();
    for pair in table.pairs::<String, LuaValue>() {
        let (key, value) = pair?;
        let value = match value {
            LuaValue::Boolean(v) => PayloadValue::Bool(v),
            LuaValue::Integer(v) => PayloadValue::Int(v),
            LuaValue::Number(v) => PayloadValue::Number(v),
            LuaValue::String(s) => PayloadValue::Text(s.to_string_lossy()),
            other => {
                log::debug!("Dropping payload field '{}' of type {}", key, other.type_name());
                continue;
            }
        };
        payload.insert(key, value);
    }
    Ok(payload)
}

fn payload_to_table(lua: &Lua, payload: &Payload) -> LuaResult<LuaTable> {
    let table = lua.create_table()?;
    for (key, value) in payload {
        match value {
            PayloadValue::Bool(v) => table.set(key.as_str(), *v)?,
            PayloadValue::Int(v) => table.set(key.as_str(), *v)?,
            PayloadValue::Number(v) => table.set(key.as_str(), *v)?,
            PayloadValue::Text(v) => table.set(key.as_str(), v.as_str())?,
            PayloadValue::Entity(v) => table.set(key.as_str(), v.to_bits() as i64)?,
        }
    }
    Ok(table)
}
