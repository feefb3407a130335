//! # Main Display Module
//!
//! Layout of the tuner window: tuning menu, start/stop button, result label
//! and cent meter.

use iced::widget::{Space, button, column, container, pick_list, text};
use iced::{Alignment, Element, Length};

use hps_tuner_core::Detection;

use super::cent_meter::CentMeter;
use crate::{AppDisplayData, Message};

/// Creates the complete main application view
pub fn create_main_view(data: &AppDisplayData) -> Element<'_, Message> {
    let tuning_menu = pick_list(
        data.choices.as_slice(),
        Some(data.selected),
        Message::TuningSelected,
    );

    let start_stop = if data.active.is_some() {
        button(text("Stop Tuner")).on_press(Message::StopTuner)
    } else {
        button(text("Start Tuner")).on_press(Message::StartTuner)
    };

    let result_text = match &data.last_detection {
        Some(detection) => detection.to_string(),
        None => Detection::NoPitch(hps_tuner_core::NoPitchReason::InsufficientSignal).to_string(),
    };

    let pitch = data.last_detection.as_ref().and_then(Detection::pitch);

    let stable_text = match &data.stable_note {
        Some(note) => format!("Stable: {note}"),
        None => String::new(),
    };

    let content = column![
        text("Select the desired tuning:"),
        tuning_menu,
        start_stop,
        text(result_text).size(32),
        CentMeter::new(pitch, data.active).view(),
        text(stable_text).size(16),
        Space::with_height(5),
        text(data.status.as_str()).size(14),
    ]
    .spacing(10)
    .align_x(Alignment::Center);

    container(content)
        .padding(20)
        .center_x(Length::Fill)
        .into()
}
