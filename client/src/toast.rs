//! User-visible notifications.
//!
//! Mutations push toasts here; a view layer subscribes and renders them,
//! removing each once its duration has passed.

use std::cell::RefCell;
use std::rc::Rc;

use uuid::Uuid;

use crate::listeners::{ListenerId, Listeners};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastType {
    Error,
    Success,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: Uuid,
    pub message: String,
    pub toast_type: ToastType,
    pub duration: Option<u32>, // milliseconds, None for no auto-dismiss
}

impl Toast {
    pub fn new(message: String, toast_type: ToastType) -> Self {
        Self {
            id: Uuid::new_v4(),
            message,
            toast_type,
            duration: Some(5000),
        }
    }

    pub fn error(message: String) -> Self {
        Self::new(message, ToastType::Error)
    }

    pub fn success(message: String) -> Self {
        Self::new(message, ToastType::Success)
    }

    pub fn info(message: String) -> Self {
        Self::new(message, ToastType::Info)
    }

    pub fn duration(mut self, duration_ms: u32) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    pub fn no_auto_dismiss(mut self) -> Self {
        self.duration = None;
        self
    }
}

/// Visible toasts, oldest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToastState {
    pub toasts: Vec<Toast>,
}

pub enum ToastAction {
    Add(Toast),
    Remove(Uuid),
    Clear,
}

impl ToastState {
    pub fn reduce(&mut self, action: ToastAction) {
        match action {
            ToastAction::Add(toast) => self.toasts.push(toast),
            ToastAction::Remove(id) => {
                self.toasts.retain(|toast| toast.id != id)
            }
            ToastAction::Clear => self.toasts.clear(),
        }
    }
}

/// Shared handle to the toast list.
#[derive(Clone, Default)]
pub struct Toasts {
    state: Rc<RefCell<ToastState>>,
    listeners: Rc<Listeners>,
}

impl PartialEq for Toasts {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Toasts {
    pub fn new() -> Self {
        Self::default()
    }

    fn dispatch(&self, action: ToastAction) {
        self.state.borrow_mut().reduce(action);
        self.listeners.notify();
    }

    pub fn add(&self, toast: Toast) -> Uuid {
        let id = toast.id;
        match toast.toast_type {
            ToastType::Error => tracing::debug!(%id, "error toast: {}", toast.message),
            _ => tracing::trace!(%id, "toast: {}", toast.message),
        }
        self.dispatch(ToastAction::Add(toast));
        id
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        self.add(Toast::error(message.into()))
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.add(Toast::success(message.into()))
    }

    pub fn info(&self, message: impl Into<String>) -> Uuid {
        self.add(Toast::info(message.into()))
    }

    pub fn remove(&self, id: Uuid) {
        self.dispatch(ToastAction::Remove(id));
    }

    pub fn clear(&self) {
        self.dispatch(ToastAction::Clear);
    }

    pub fn snapshot(&self) -> Vec<Toast> {
        self.state.borrow().toasts.clone()
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.listeners.add(Rc::new(listener))
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}
