//! # Cent Meter Widget
//!
//! Horizontal gauge of the deviation between the detected pitch and the note it
//! was mapped to. The scale follows the mapping: in a tuning profile it reaches
//! halfway to the neighbouring string (where the mapper would switch notes), in
//! equal-tempered mode it covers half a semitone each way.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{Color, Element, Point, Rectangle, Renderer, Size, Theme, mouse};

use hps_tuner_core::{PitchResult, tuning};

use crate::TuningChoice;

/// Half a semitone, the widest deviation a chromatic mapper can report.
const SEMITONE_HALF: f64 = 50.0;

/// Deviation still shown as in tune.
const IN_TUNE_CENTS: f64 = 5.0;

/// Distance between scale ticks, in cents.
const TICK_STEP: f64 = 10.0;

/// Half-width of the meter scale in cents for `note` under `choice`.
///
/// For a profile this is half the distance to the closest neighbouring string;
/// a note missing from the profile and equal-tempered mode use half a semitone.
pub fn meter_range(choice: TuningChoice, note: &str) -> f64 {
    let TuningChoice::Profile(name) = choice else {
        return SEMITONE_HALF;
    };
    let notes = tuning::lookup(name).notes;
    let Some(index) = notes.iter().position(|(label, _)| *label == note) else {
        return SEMITONE_HALF;
    };
    let target = notes[index].1;

    let lower = index.checked_sub(1).map(|i| notes[i].1);
    let upper = notes.get(index + 1).map(|&(_, freq)| freq);
    lower
        .into_iter()
        .chain(upper)
        .map(|neighbour| tuning::calculate_cents_deviation(neighbour, target).abs() / 2.0)
        .reduce(f64::min)
        .unwrap_or(SEMITONE_HALF)
}

/// Position of `cents` on a scale of `±range`, 0.0 at the left edge and 1.0 at
/// the right. Deviations past the scale stick to the edge.
pub fn scale_position(cents: f64, range: f64) -> f32 {
    ((cents.clamp(-range, range) + range) / (2.0 * range)) as f32
}

pub struct CentMeter {
    /// Deviation from the mapped note, None while nothing is detected
    cents: Option<f64>,
    /// Half-width of the scale in cents
    range: f64,
}

impl CentMeter {
    /// Meter for the latest pitch, scaled to the tuning it was detected with.
    pub fn new(result: Option<&PitchResult>, choice: Option<TuningChoice>) -> Self {
        match (result, choice) {
            (Some(result), Some(choice)) => Self {
                cents: Some(result.cents_deviation()),
                range: meter_range(choice, &result.note),
            },
            _ => Self {
                cents: None,
                range: SEMITONE_HALF,
            },
        }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(40.0)),
        )
        .into()
    }

    fn x_for(&self, cents: f64, width: f32) -> f32 {
        scale_position(cents, self.range) * width
    }
}

impl<Message> canvas::Program<Message> for CentMeter {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let width = bounds.width;
        let height = bounds.height;

        frame.fill(
            &Path::rectangle(Point::ORIGIN, bounds.size()),
            Color::from_rgb8(0x2B, 0x2B, 0x30),
        );

        let zone_left = self.x_for(-IN_TUNE_CENTS, width);
        let zone_right = self.x_for(IN_TUNE_CENTS, width);
        frame.fill(
            &Path::rectangle(
                Point::new(zone_left, 0.0),
                Size::new((zone_right - zone_left).max(1.0), height),
            ),
            Color::from_rgba8(0x34, 0xDB, 0x98, 0.25),
        );

        let ticks = (self.range / TICK_STEP).floor() as i32;
        for k in -ticks..=ticks {
            let x = self.x_for(f64::from(k) * TICK_STEP, width);
            let tick_height = if k == 0 { height } else { height * 0.3 };
            frame.stroke(
                &Path::line(Point::new(x, height - tick_height), Point::new(x, height)),
                Stroke::default()
                    .with_width(if k == 0 { 2.0 } else { 1.0 })
                    .with_color(Color::from_rgb8(0x9A, 0x9A, 0xA0)),
            );
        }

        let Some(cents) = self.cents else {
            return vec![frame.into_geometry()];
        };

        let x = self.x_for(cents, width);
        let color = if cents.abs() <= IN_TUNE_CENTS {
            Color::from_rgb8(0x34, 0xDB, 0x98)
        } else if cents.abs() <= self.range {
            Color::from_rgb8(0xFF, 0xC3, 0x00)
        } else {
            Color::from_rgb8(0xFF, 0x33, 0x33)
        };

        // Triangular pointer on top of a thin needle.
        let pointer = Path::new(|p| {
            p.move_to(Point::new(x - 6.0, 0.0));
            p.line_to(Point::new(x + 6.0, 0.0));
            p.line_to(Point::new(x, 10.0));
            p.close();
        });
        frame.fill(&pointer, color);
        frame.stroke(
            &Path::line(Point::new(x, 0.0), Point::new(x, height)),
            Stroke::default().with_width(2.0).with_color(color),
        );

        vec![frame.into_geometry()]
    }
}
