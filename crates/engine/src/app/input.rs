use winit::event::{ElementState, KeyEvent, MouseButton as WinitMouseButton};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::event::{Event, EventPayload, EventTag, Key, MouseButton};
use crate::geometry::Location;

const LETTER_KEYS: [(KeyCode, char); 26] = [
    (KeyCode::KeyA, 'a'),
    (KeyCode::KeyB, 'b'),
    (KeyCode::KeyC, 'c'),
    (KeyCode::KeyD, 'd'),
    (KeyCode::KeyE, 'e'),
    (KeyCode::KeyF, 'f'),
    (KeyCode::KeyG, 'g'),
    (KeyCode::KeyH, 'h'),
    (KeyCode::KeyI, 'i'),
    (KeyCode::KeyJ, 'j'),
    (KeyCode::KeyK, 'k'),
    (KeyCode::KeyL, 'l'),
    (KeyCode::KeyM, 'm'),
    (KeyCode::KeyN, 'n'),
    (KeyCode::KeyO, 'o'),
    (KeyCode::KeyP, 'p'),
    (KeyCode::KeyQ, 'q'),
    (KeyCode::KeyR, 'r'),
    (KeyCode::KeyS, 's'),
    (KeyCode::KeyT, 't'),
    (KeyCode::KeyU, 'u'),
    (KeyCode::KeyV, 'v'),
    (KeyCode::KeyW, 'w'),
    (KeyCode::KeyX, 'x'),
    (KeyCode::KeyY, 'y'),
    (KeyCode::KeyZ, 'z'),
];

/// Turns window input into engine events. Mouse buttons carry the last
/// cursor position seen inside the frame.
#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    cursor: Location,
    quit_requested: bool,
}

impl InputCollector {
    pub(crate) fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub(crate) fn mark_quit_requested(&mut self) -> Event {
        self.quit_requested = true;
        Event::quit()
    }

    pub(crate) fn handle_keyboard_input(&mut self, key_event: &KeyEvent) -> Option<Event> {
        self.handle_key_state(key_event.physical_key, key_event.state, key_event.repeat)
    }

    /// Key repeats are dropped so a held key posts a single `KEY_DOWN`.
    pub(crate) fn handle_key_state(
        &mut self,
        key: PhysicalKey,
        state: ElementState,
        repeat: bool,
    ) -> Option<Event> {
        if repeat {
            return None;
        }
        let key = translate_key(key);
        Some(match state {
            ElementState::Pressed => Event::key_down(key),
            ElementState::Released => Event::key_up(key),
        })
    }

    /// `position` is `None` when the cursor is outside the scaled frame.
    pub(crate) fn handle_cursor_moved(&mut self, position: Option<Location>) -> Option<Event> {
        let position = position?;
        self.cursor = position;
        Some(Event {
            tag: EventTag::MOUSE_MOTION,
            payload: EventPayload::MouseMotion { position },
        })
    }

    pub(crate) fn handle_mouse_input(&mut self, button: WinitMouseButton, state: ElementState) -> Event {
        let tag = match state {
            ElementState::Pressed => EventTag::MOUSE_BUTTON_DOWN,
            ElementState::Released => EventTag::MOUSE_BUTTON_UP,
        };
        Event {
            tag,
            payload: EventPayload::MouseButton {
                button: translate_mouse_button(button),
                position: self.cursor,
            },
        }
    }
}

pub(crate) fn translate_key(key: PhysicalKey) -> Key {
    let PhysicalKey::Code(code) = key else {
        return Key::Other;
    };
    match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::Space => Key::Space,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Enter,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        other => LETTER_KEYS
            .iter()
            .find(|(code, _)| *code == other)
            .map(|(_, letter)| Key::Char(*letter))
            .unwrap_or(Key::Other),
    }
}

fn translate_mouse_button(button: WinitMouseButton) -> MouseButton {
    match button {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        _ => MouseButton::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_and_letter_keys_translate() {
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::Space)), Key::Space);
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::Escape)), Key::Escape);
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::ArrowLeft)), Key::Left);
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::KeyW)), Key::Char('w'));
        assert_eq!(translate_key(PhysicalKey::Code(KeyCode::F3)), Key::Other);
    }

    #[test]
    fn key_press_and_release_map_to_tags() {
        let mut input = InputCollector::default();
        let down = input
            .handle_key_state(PhysicalKey::Code(KeyCode::Space), ElementState::Pressed, false)
            .expect("key down");
        let up = input
            .handle_key_state(PhysicalKey::Code(KeyCode::Space), ElementState::Released, false)
            .expect("key up");
        assert_eq!(down, Event::key_down(Key::Space));
        assert_eq!(up, Event::key_up(Key::Space));
    }

    #[test]
    fn held_key_does_not_repeat() {
        let mut input = InputCollector::default();
        assert!(input
            .handle_key_state(PhysicalKey::Code(KeyCode::Space), ElementState::Pressed, true)
            .is_none());
    }

    #[test]
    fn mouse_buttons_carry_last_cursor_position() {
        let mut input = InputCollector::default();
        let motion = input
            .handle_cursor_moved(Some(Location::new(40, 30)))
            .expect("motion");
        assert_eq!(motion.position(), Some(Location::new(40, 30)));
        assert!(input.handle_cursor_moved(None).is_none());

        let click = input.handle_mouse_input(WinitMouseButton::Left, ElementState::Pressed);
        assert_eq!(click.tag, EventTag::MOUSE_BUTTON_DOWN);
        assert_eq!(
            click.payload,
            EventPayload::MouseButton {
                button: MouseButton::Left,
                position: Location::new(40, 30),
            }
        );
    }

    #[test]
    fn close_request_posts_quit() {
        let mut input = InputCollector::default();
        assert!(!input.quit_requested());
        assert_eq!(input.mark_quit_requested().tag, EventTag::QUIT);
        assert!(input.quit_requested());
    }
}
