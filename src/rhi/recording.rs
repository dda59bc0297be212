//! Recording Device
//!
//! A [`RenderDevice`] that executes nothing and remembers everything. It
//! allocates real handles from slot maps, keeps every descriptor it was
//! given, and stores each submitted command stream verbatim. Headless tools
//! and tests use it to inspect exactly what a frame asked the GPU to do.
//!
//! The free functions at the bottom slice a flat command stream by pass
//! scope, which is the usual way to assert on one pass in isolation.

use glam::Vec4;
use slotmap::SlotMap;

use super::{
    BufferDescriptor, BufferId, Command, RenderDevice, ShaderDescriptor, ShaderId, ShaderState,
    StateDescriptor, StateId, TextureDescriptor, TextureId,
};
use crate::errors::{DeferredError, Result};

#[derive(Debug, Clone)]
struct ShaderEntry {
    desc: ShaderDescriptor,
    state: ShaderState,
}

#[derive(Debug)]
pub struct RecordingDevice {
    initialized: bool,
    texture_budget: Option<usize>,

    textures: SlotMap<TextureId, TextureDescriptor>,
    buffers: SlotMap<BufferId, BufferDescriptor>,
    states: SlotMap<StateId, StateDescriptor>,
    shaders: SlotMap<ShaderId, ShaderEntry>,

    submissions: Vec<Vec<Command>>,
    backbuffer_clears: Vec<Vec4>,
    presents: u32,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    /// An initialized device whose shaders compile instantly.
    #[must_use]
    pub fn new() -> Self {
        Self {
            initialized: true,
            texture_budget: None,
            textures: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            states: SlotMap::with_key(),
            shaders: SlotMap::with_key(),
            submissions: Vec::new(),
            backbuffer_clears: Vec::new(),
            presents: 0,
        }
    }

    // === Configuration ===

    pub fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    pub fn set_shader_state(&mut self, shader: ShaderId, state: ShaderState) {
        if let Some(entry) = self.shaders.get_mut(shader) {
            entry.state = state;
        }
    }

    /// Texture creation fails once this many textures are alive.
    pub fn set_texture_budget(&mut self, budget: Option<usize>) {
        self.texture_budget = budget;
    }

    // === Inspection ===

    #[must_use]
    pub fn texture(&self, id: TextureId) -> Option<&TextureDescriptor> {
        self.textures.get(id)
    }

    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    #[must_use]
    pub fn buffer(&self, id: BufferId) -> Option<&BufferDescriptor> {
        self.buffers.get(id)
    }

    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&StateDescriptor> {
        self.states.get(id)
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn submissions(&self) -> &[Vec<Command>] {
        &self.submissions
    }

    #[must_use]
    pub fn backbuffer_clears(&self) -> &[Vec4] {
        &self.backbuffer_clears
    }

    #[must_use]
    pub fn present_count(&self) -> u32 {
        self.presents
    }

    /// All commands submitted so far, flattened in submission order.
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        self.submissions.iter().flatten().cloned().collect()
    }

    /// Drains everything recorded so far.
    pub fn take_commands(&mut self) -> Vec<Command> {
        self.backbuffer_clears.clear();
        std::mem::take(&mut self.submissions).into_iter().flatten().collect()
    }
}

impl RenderDevice for RecordingDevice {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn shader_state(&self, shader: ShaderId) -> ShaderState {
        self.shaders.get(shader).map_or(ShaderState::Failed, |entry| entry.state)
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureId> {
        if self.texture_budget.is_some_and(|budget| self.textures.len() >= budget) {
            return Err(DeferredError::ResourceCreation {
                label: desc.label.to_string(),
                reason: "texture budget exhausted".to_string(),
            });
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(DeferredError::ResourceCreation {
                label: desc.label.to_string(),
                reason: format!("zero-sized texture {}x{}", desc.width, desc.height),
            });
        }
        Ok(self.textures.insert(desc.clone()))
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.textures.remove(texture);
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> Result<BufferId> {
        Ok(self.buffers.insert(desc.clone()))
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(buffer);
    }

    fn create_state(&mut self, desc: &StateDescriptor) -> Result<StateId> {
        Ok(self.states.insert(desc.clone()))
    }

    fn create_shader(&mut self, desc: &ShaderDescriptor) -> Result<ShaderId> {
        Ok(self.shaders.insert(ShaderEntry { desc: desc.clone(), state: ShaderState::Compiled }))
    }

    fn submit(&mut self, commands: Vec<Command>) {
        self.submissions.push(commands);
    }

    fn clear_backbuffer(&mut self, color: Vec4) {
        self.backbuffer_clears.push(color);
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}

// ─── Stream Helpers ──────────────────────────────────────────────────────────

/// Returns the body of every scope named `name`, outermost match first.
///
/// The body excludes the scope's own `BeginPass` / `EndPass` markers but
/// includes any nested scopes.
#[must_use]
pub fn scopes<'a>(commands: &'a [Command], name: &str) -> Vec<&'a [Command]> {
    let mut found = Vec::new();
    let mut i = 0;
    while i < commands.len() {
        if let Command::BeginPass(label) = &commands[i]
            && label == name
        {
            let start = i + 1;
            let mut depth = 1u32;
            let mut j = start;
            while j < commands.len() && depth > 0 {
                match commands[j] {
                    Command::BeginPass(_) => depth += 1,
                    Command::EndPass => depth -= 1,
                    _ => {}
                }
                j += 1;
            }
            let end = if depth == 0 { j - 1 } else { j };
            found.push(&commands[start..end]);
        }
        i += 1;
    }
    found
}

/// Number of `Draw` and `DrawIndexed` commands.
#[must_use]
pub fn draw_count(commands: &[Command]) -> usize {
    commands
        .iter()
        .filter(|c| matches!(c, Command::Draw { .. } | Command::DrawIndexed { .. }))
        .count()
}

/// Names of the top-level scopes in order of appearance.
#[must_use]
pub fn top_level_scopes(commands: &[Command]) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0u32;
    for command in commands {
        match command {
            Command::BeginPass(name) => {
                if depth == 0 {
                    names.push(name.to_string());
                }
                depth += 1;
            }
            Command::EndPass => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    names
}
