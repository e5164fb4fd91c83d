//! Control registry — address → control, dispatching remote messages onto a
//! target as if they were local edits.
//!
//! The registry is generic over the state its handlers mutate. Handlers get
//! `&mut T` for the duration of one dispatch, so no control keeps a reference
//! into the state it drives.

use std::collections::BTreeMap;

use super::{ControlError, ControlMessage};

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = Result<(), HandlerError>;

type ValueHandler<T> = Box<dyn FnMut(&mut T, f32) -> HandlerResult>;
type TriggerHandler<T> = Box<dyn FnMut(&mut T, &[f32]) -> HandlerResult>;
type SelectionHandler<T> = Box<dyn FnMut(&mut T, usize) -> HandlerResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Value,
    Trigger,
    Selection,
}

enum Control<T> {
    Value {
        value: f32,
        on_change: ValueHandler<T>,
    },
    Trigger {
        action: TriggerHandler<T>,
    },
    Selection {
        options: Vec<String>,
        index: usize,
        on_change: SelectionHandler<T>,
    },
}

impl<T> Control<T> {
    fn kind(&self) -> ControlKind {
        match self {
            Control::Value { .. } => ControlKind::Value,
            Control::Trigger { .. } => ControlKind::Trigger,
            Control::Selection { .. } => ControlKind::Selection,
        }
    }
}

/// Option index for a normalized argument: `floor((n - 1) * (1 - arg))`.
pub fn selection_index(option_count: usize, arg: f32) -> usize {
    let last = option_count.saturating_sub(1);
    (((last as f32) * (1.0 - arg)).floor() as usize).min(last)
}

/// Inverse of [`selection_index`], for feedback.
pub fn selection_arg(option_count: usize, index: usize) -> f32 {
    let last = option_count.saturating_sub(1);
    if last == 0 {
        return 1.0;
    }
    1.0 - index as f32 / last as f32
}

/// Flat map from slash-delimited addresses to controls.
pub struct ControlRegistry<T> {
    controls: BTreeMap<String, Control<T>>,
}

impl<T> Default for ControlRegistry<T> {
    fn default() -> Self {
        Self {
            controls: BTreeMap::new(),
        }
    }
}

impl<T> ControlRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, address: impl Into<String>, control: Control<T>) {
        let address = address.into();
        if self.controls.insert(address.clone(), control).is_some() {
            log::debug!("control {address} re-registered");
        }
    }

    /// Register a continuous value. Replaces any control at `address`.
    pub fn register_value<F>(&mut self, address: impl Into<String>, initial: f32, on_change: F)
    where
        F: FnMut(&mut T, f32) -> HandlerResult + 'static,
    {
        self.insert(
            address,
            Control::Value {
                value: initial,
                on_change: Box::new(on_change),
            },
        );
    }

    /// Register an action. Replaces any control at `address`.
    pub fn register_trigger<F>(&mut self, address: impl Into<String>, action: F)
    where
        F: FnMut(&mut T, &[f32]) -> HandlerResult + 'static,
    {
        self.insert(
            address,
            Control::Trigger {
                action: Box::new(action),
            },
        );
    }

    /// Register a discrete choice among `options`. Replaces any control at
    /// `address`.
    pub fn register_selection<F>(
        &mut self,
        address: impl Into<String>,
        options: Vec<String>,
        initial: usize,
        on_change: F,
    ) where
        F: FnMut(&mut T, usize) -> HandlerResult + 'static,
    {
        self.insert(
            address,
            Control::Selection {
                options,
                index: initial,
                on_change: Box::new(on_change),
            },
        );
    }

    /// Drop every control, at session teardown.
    pub fn clear(&mut self) {
        self.controls.clear();
    }

    pub fn contains(&self, address: &str) -> bool {
        self.controls.contains_key(address)
    }

    pub fn kind(&self, address: &str) -> Option<ControlKind> {
        self.controls.get(address).map(Control::kind)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.controls.keys().map(String::as_str)
    }

    /// Current value of a value control.
    pub fn value(&self, address: &str) -> Option<f32> {
        match self.controls.get(address)? {
            Control::Value { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Current option of a selection control.
    pub fn selection(&self, address: &str) -> Option<(usize, &str)> {
        match self.controls.get(address)? {
            Control::Selection { options, index, .. } => {
                options.get(*index).map(|o| (*index, o.as_str()))
            }
            _ => None,
        }
    }

    /// Record a value changed locally, without running its handler.
    pub fn sync(&mut self, address: &str, new_value: f32) -> bool {
        match self.controls.get_mut(address) {
            Some(Control::Value { value, .. }) => {
                *value = new_value;
                true
            }
            _ => false,
        }
    }

    /// Feedback view: value controls as-is, selections as normalized args.
    pub fn values(&self) -> Vec<(&str, f32)> {
        self.controls
            .iter()
            .filter_map(|(address, control)| match control {
                Control::Value { value, .. } => Some((address.as_str(), *value)),
                Control::Selection { options, index, .. } => {
                    Some((address.as_str(), selection_arg(options.len(), *index)))
                }
                Control::Trigger { .. } => None,
            })
            .collect()
    }

    pub fn dispatch_message(
        &mut self,
        target: &mut T,
        message: &ControlMessage,
    ) -> Result<(), ControlError> {
        self.dispatch(target, &message.address, &message.args)
    }

    /// Apply a remote message as if the control had been edited locally.
    ///
    /// A value control stores `args[0]` and runs its handler once; if the
    /// handler fails the previous value is restored. Unknown addresses are
    /// logged and returned as [`ControlError::Unregistered`].
    pub fn dispatch(
        &mut self,
        target: &mut T,
        address: &str,
        args: &[f32],
    ) -> Result<(), ControlError> {
        let Some(control) = self.controls.get_mut(address) else {
            log::warn!("dropping message for unregistered control {address}");
            return Err(ControlError::Unregistered(address.to_string()));
        };
        let handler_error = |source| ControlError::Handler {
            address: address.to_string(),
            source,
        };

        match control {
            Control::Value { value, on_change } => {
                let new_value = *args.first().ok_or_else(|| ControlError::MissingArgument {
                    address: address.to_string(),
                })?;
                let previous = std::mem::replace(value, new_value);
                if let Err(e) = on_change(target, new_value) {
                    *value = previous;
                    return Err(handler_error(e));
                }
            }
            Control::Trigger { action } => action(target, args).map_err(handler_error)?,
            Control::Selection {
                options,
                index,
                on_change,
            } => {
                let arg = *args.first().ok_or_else(|| ControlError::MissingArgument {
                    address: address.to_string(),
                })?;
                if !(0.0..=1.0).contains(&arg) {
                    return Err(ControlError::OutOfRange {
                        address: address.to_string(),
                        value: arg,
                    });
                }
                if options.is_empty() {
                    return Err(ControlError::NoOptions {
                        address: address.to_string(),
                    });
                }
                let chosen = selection_index(options.len(), arg);
                let previous = std::mem::replace(index, chosen);
                if let Err(e) = on_change(target, chosen) {
                    *index = previous;
                    return Err(handler_error(e));
                }
            }
        }
        Ok(())
    }
}
