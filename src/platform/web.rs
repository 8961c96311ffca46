//! Browser implementations (requestAnimationFrame)

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use super::{FrameHandle, FrameScheduler};

/// Shared slot for the frame callback
///
/// The callback usually captures the game that owns the scheduler, so it is
/// installed after both exist.
pub type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// requestAnimationFrame-backed scheduler
pub struct WebFrameScheduler {
    callback: FrameCallback,
}

impl WebFrameScheduler {
    pub fn new() -> (Self, FrameCallback) {
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        (
            Self {
                callback: callback.clone(),
            },
            callback,
        )
    }
}

impl FrameScheduler for WebFrameScheduler {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        let window = web_sys::window()?;
        let slot = self.callback.borrow();
        let Some(callback) = slot.as_ref() else {
            log::warn!("Frame requested before callback was installed");
            return None;
        };
        match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
            Ok(id) => Some(FrameHandle(id)),
            Err(e) => {
                log::error!("requestAnimationFrame failed: {:?}", e);
                None
            }
        }
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(handle.0);
        }
    }
}
