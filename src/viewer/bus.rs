//! Addressed command dispatch
//!
//! Callers such as a toolbar address viewers by identifier. The bus keeps a
//! map from identifier to viewer and delivers each command to exactly that
//! viewer, or drops it if nothing is attached under the identifier. Commands
//! without an identifier go to the one anonymous viewer, if attached.
//!
//! Each attached viewer gets a worker task that applies its commands in
//! arrival order.

use crate::error::{Error, Result};
use crate::pdf::RenderBackend;
use crate::viewer::{ViewerInstance, ZoomLevel};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Navigation requests a viewer understands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NextPage,
    PrevPage,
    GotoPage(u32),
    ChangeZoom(ZoomLevel),
}

/// Who a command is for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// The viewer attached under this identifier
    Instance(String),
    /// The anonymous viewer (single-viewer hosts)
    Unaddressed,
}

impl Target {
    pub fn from_id(id: Option<&str>) -> Self {
        match id {
            Some(id) => Target::Instance(id.to_string()),
            None => Target::Unaddressed,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Instance(id) => f.write_str(id),
            Target::Unaddressed => f.write_str("<unaddressed>"),
        }
    }
}

/// A command together with its destination
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationCommand {
    pub target: Target,
    pub command: Command,
}

impl NavigationCommand {
    pub fn new(target: Target, command: Command) -> Self {
        Self { target, command }
    }
}

struct Envelope {
    command: Command,
    applied: Option<oneshot::Sender<bool>>,
}

struct Attached<B: RenderBackend> {
    viewer: ViewerInstance<B>,
    queue: mpsc::UnboundedSender<Envelope>,
    worker: JoinHandle<()>,
}

impl<B: RenderBackend> Drop for Attached<B> {
    fn drop(&mut self) {
        self.worker.abort();
        self.viewer.release();
    }
}

/// Registry of attached viewers, addressed by identifier
pub struct CommandBus<B: RenderBackend> {
    viewers: RwLock<HashMap<Target, Attached<B>>>,
}

impl<B: RenderBackend> CommandBus<B> {
    pub fn new() -> Self {
        Self {
            viewers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a viewer under its own identifier and start its command worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach(&self, viewer: ViewerInstance<B>) -> Result<()> {
        let target = Target::from_id(viewer.id());
        let mut viewers = self.viewers.write();
        if viewers.contains_key(&target) {
            return Err(Error::ViewerAlreadyAttached {
                id: target.to_string(),
            });
        }

        let (queue, mut commands) = mpsc::unbounded_channel::<Envelope>();
        let worker_viewer = viewer.clone();
        let worker = tokio::spawn(async move {
            while let Some(envelope) = commands.recv().await {
                let changed = worker_viewer.apply(envelope.command).await;
                if let Some(applied) = envelope.applied {
                    let _ = applied.send(changed);
                }
            }
        });

        tracing::info!(viewer = %target, "viewer attached");
        viewers.insert(
            target,
            Attached {
                viewer,
                queue,
                worker,
            },
        );
        Ok(())
    }

    /// Unregister a viewer, stopping its worker and pending resize work.
    pub fn detach(&self, target: &Target) -> Option<ViewerInstance<B>> {
        let attached = self.viewers.write().remove(target)?;
        tracing::info!(viewer = %target, "viewer detached");
        Some(attached.viewer.clone())
    }

    pub fn get(&self, target: &Target) -> Option<ViewerInstance<B>> {
        self.viewers
            .read()
            .get(target)
            .map(|attached| attached.viewer.clone())
    }

    pub fn targets(&self) -> Vec<Target> {
        self.viewers.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.viewers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewers.read().is_empty()
    }

    /// Fire-and-forget delivery. Commands for unknown targets are dropped.
    pub fn broadcast(&self, message: NavigationCommand) {
        let viewers = self.viewers.read();
        match viewers.get(&message.target) {
            Some(attached) => {
                let _ = attached.queue.send(Envelope {
                    command: message.command,
                    applied: None,
                });
            }
            None => {
                tracing::debug!(viewer = %message.target, "no viewer attached; command dropped");
            }
        }
    }

    /// Deliver a command and wait until the viewer has applied it.
    /// Returns whether the viewer's page or zoom changed.
    pub async fn dispatch(&self, message: NavigationCommand) -> Result<bool> {
        let (applied, done) = oneshot::channel();
        {
            let viewers = self.viewers.read();
            let attached = viewers
                .get(&message.target)
                .ok_or_else(|| Error::ViewerNotFound {
                    id: message.target.to_string(),
                })?;
            attached
                .queue
                .send(Envelope {
                    command: message.command,
                    applied: Some(applied),
                })
                .map_err(|_| Error::ViewerDetached)?;
        }

        done.await.map_err(|_| Error::ViewerDetached)
    }

    /// Commands addressed to one viewer
    pub fn instance(&self, id: &str) -> Remote<'_, B> {
        Remote {
            bus: self,
            target: Target::Instance(id.to_string()),
        }
    }

    /// Unaddressed next page, for single-viewer hosts
    pub fn next_page(&self) {
        self.broadcast(NavigationCommand::new(Target::Unaddressed, Command::NextPage));
    }

    /// Unaddressed previous page, for single-viewer hosts
    pub fn prev_page(&self) {
        self.broadcast(NavigationCommand::new(Target::Unaddressed, Command::PrevPage));
    }
}

impl<B: RenderBackend> Default for CommandBus<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fire-and-forget command surface bound to one viewer identifier
pub struct Remote<'a, B: RenderBackend> {
    bus: &'a CommandBus<B>,
    target: Target,
}

impl<B: RenderBackend> Remote<'_, B> {
    fn send(&self, command: Command) {
        self.bus
            .broadcast(NavigationCommand::new(self.target.clone(), command));
    }

    pub fn next_page(&self) {
        self.send(Command::NextPage);
    }

    pub fn prev_page(&self) {
        self.send(Command::PrevPage);
    }

    pub fn goto_page(&self, page: u32) {
        self.send(Command::GotoPage(page));
    }

    pub fn change_zoom(&self, zoom: impl Into<ZoomLevel>) {
        self.send(Command::ChangeZoom(zoom.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_id() {
        assert_eq!(Target::from_id(Some("v1")), Target::Instance("v1".to_string()));
        assert_eq!(Target::from_id(None), Target::Unaddressed);
        assert_eq!(Target::Unaddressed.to_string(), "<unaddressed>");
    }
}
