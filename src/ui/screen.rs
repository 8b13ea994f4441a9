use ratatui::Frame;

use crate::{
    app::{App, AppState},
    ui::{render_menu, render_test},
};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Test selection
pub struct MenuScreen;

impl Screen for MenuScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let area = f.area();
        render_menu(app, area, f.buffer_mut());
    }
}

/// A running digit span or operation span test, including its overlay panels
pub struct TestScreen;

impl Screen for TestScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let area = f.area();
        render_test(app, area, f.buffer_mut());
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Menu => Box::new(MenuScreen),
        AppState::Test => Box::new(TestScreen),
    }
}
