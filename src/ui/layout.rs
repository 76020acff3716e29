use ratatui::prelude::*;

use crate::app::App;

use super::catalog;
use super::filter_box;
use super::form;
use super::notifications;
use super::output;
use super::status_bar;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let [main_area, status_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

    let [left_area, right_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
            .areas(main_area);

    if app.filter_active || !app.filter.value().is_empty() {
        let [filter_area, tree_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(1)]).areas(left_area);
        filter_box::draw(frame, &app.filter, app.filter_active, filter_area);
        catalog::draw(frame, app, tree_area);
    } else {
        catalog::draw(frame, app, left_area);
    }

    // The form takes exactly the rows it has; the output pane gets the rest.
    let form_height = app.form_fields().len() as u16 + 2;
    let [form_area, output_area] =
        Layout::vertical([Constraint::Length(form_height), Constraint::Min(1)]).areas(right_area);

    form::draw(frame, app, form_area);
    output::draw(frame, app, output_area);
    status_bar::draw(frame, app, status_area);
    notifications::draw(frame, app);
}
