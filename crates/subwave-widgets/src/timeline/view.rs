//! Timeline view function

use super::canvas::TimelineCanvas;
use super::{Timeline, TimelineInput};
use iced::widget::Canvas;
use iced::{Element, Length};
use subwave_core::document::SubtitleDocument;
use subwave_core::playback::PlaybackController;

/// Create the timeline element.
///
/// `on_input` is called for every pointer, wheel and keyboard event the
/// widget captures; route the resulting message back through
/// [`Timeline::interact`] in your update function.
///
/// ```ignore
/// fn view(&self) -> Element<Message> {
///     timeline(&self.timeline, &self.doc, &self.playback, Message::Timeline).into()
/// }
/// ```
pub fn timeline<'a, Message>(
    state: &'a Timeline,
    doc: &'a SubtitleDocument,
    playback: &'a PlaybackController,
    on_input: impl Fn(TimelineInput) -> Message + 'a,
) -> Element<'a, Message>
where
    Message: 'a,
{
    Canvas::new(TimelineCanvas { timeline: state, doc, playback, on_input })
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}
