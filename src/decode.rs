//! Per-entry decoding: demuxed packets in, one raw picture out.
//!
//! Every archive entry is a standalone still image, possibly in a
//! different codec than its neighbours, so a fresh decoder is built for
//! each one and torn down before the next. Only the first decoded picture
//! per entry is used.

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::Pixel,
    frame::Video as VideoFrame,
    media::Type,
    Rational,
};

use crate::{error::UgoiraError, source::MediaSource};

/// The first picture of an archive entry, with the decoder parameters the
/// downstream stages configure themselves from.
pub(crate) struct DecodedFrame {
    pub(crate) picture: VideoFrame,
    pub(crate) pixel_format: Pixel,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) aspect_ratio: Rational,
}

/// Decode the first video picture from `source`.
///
/// Picks the first stream with video media type, opens a decoder for its
/// codec, and feeds packets until one picture comes out. End of input
/// after a picture has been decoded is success; stills yield exactly one.
///
/// # Errors
///
/// - [`UgoiraError::NoVideoStream`] if no stream carries video.
/// - [`UgoiraError::NoAvailableDecoder`] if the codec has no decoder.
/// - [`UgoiraError::Ffmpeg`] on decode failure, including entries that end
///   before producing a picture.
pub(crate) fn decode_first_frame(source: &mut MediaSource<'_>) -> Result<DecodedFrame, UgoiraError> {
    let (stream_index, parameters) = {
        let stream = source
            .as_input()
            .streams()
            .find(|stream| stream.parameters().medium() == Type::Video)
            .ok_or(UgoiraError::NoVideoStream)?;
        (stream.index(), stream.parameters())
    };

    if ffmpeg_next::decoder::find(parameters.id()).is_none() {
        return Err(UgoiraError::NoAvailableDecoder);
    }

    let decoder_context = CodecContext::from_parameters(parameters)?;
    let mut decoder = decoder_context.decoder().video()?;

    let mut picture = VideoFrame::empty();
    let mut decoded = false;

    for (stream, packet) in source.as_input_mut().packets() {
        if stream.index() != stream_index {
            continue;
        }
        decoder.send_packet(&packet)?;
        if decoder.receive_frame(&mut picture).is_ok() {
            decoded = true;
            break;
        }
    }

    if !decoded {
        // Single-image formats may hold the picture until flush.
        decoder.send_eof()?;
        decoder.receive_frame(&mut picture)?;
    }

    log::debug!(
        "Decoded picture: {}x{} {:?}",
        decoder.width(),
        decoder.height(),
        decoder.format(),
    );

    Ok(DecodedFrame {
        picture,
        pixel_format: decoder.format(),
        width: decoder.width(),
        height: decoder.height(),
        aspect_ratio: decoder.aspect_ratio(),
    })
}
