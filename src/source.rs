//! Pull-based demuxer input over an archive entry.
//!
//! FFmpeg normally opens its own files; an archive entry is only
//! reachable through the ZIP library's sequential reader. [`MediaSource`]
//! bridges the two with a custom AVIO context whose read callback pulls
//! bytes from any [`Read`] implementor, then probes the stream layout so
//! the decoder stage can pick the video stream.

use std::{
    io::Read,
    marker::PhantomData,
    os::raw::{c_int, c_void},
    ptr,
};

use ffmpeg_next::format::context::Input;
use ffmpeg_sys_next::{
    av_free, av_freep, av_malloc, avformat_alloc_context, avformat_find_stream_info,
    avformat_open_input, avio_alloc_context, avio_context_free, AVFormatContext, AVIOContext,
    AVERROR, AVERROR_EOF,
};

use crate::error::UgoiraError;

/// Size of the scratch buffer handed to the AVIO layer.
const STREAM_BUFFER_SIZE: usize = 4096;

/// Read callback handed to `avio_alloc_context`.
///
/// Pulls up to `buf_size` bytes from the reader behind `opaque`. A clean
/// zero-byte read maps to `AVERROR_EOF` and a reader failure to
/// `AVERROR(EINVAL)`, which is all FFmpeg distinguishes; short reads are
/// returned as-is.
unsafe extern "C" fn read_packet<R: Read>(
    opaque: *mut c_void,
    buf: *mut u8,
    buf_size: c_int,
) -> c_int {
    let reader = &mut *(opaque as *mut R);
    let dst = std::slice::from_raw_parts_mut(buf, buf_size.max(0) as usize);
    match reader.read(dst) {
        Ok(0) => AVERROR_EOF,
        Ok(count) => count as c_int,
        Err(_) => AVERROR(libc::EINVAL),
    }
}

/// A demuxer reading from a borrowed byte stream.
///
/// Exactly one source is alive at a time; the per-frame loop drops it
/// before opening the next entry. Teardown runs in LIFO order: demuxer
/// first, then the AVIO buffer and context. The demuxer was opened with a
/// caller-supplied `pb`, which FFmpeg treats as custom I/O and leaves for
/// us to free.
pub(crate) struct MediaSource<'r> {
    input: Option<Input>,
    avio: *mut AVIOContext,
    _reader: PhantomData<&'r mut ()>,
}

impl<'r> MediaSource<'r> {
    /// Wrap `reader` in an AVIO context, open a demuxer over it with no
    /// format hint, and probe the stream layout.
    ///
    /// # Errors
    ///
    /// - [`UgoiraError::OutOfMemory`] if an FFmpeg allocation returns null.
    /// - [`UgoiraError::Ffmpeg`] if open or probe fails.
    pub(crate) fn open<R: Read>(reader: &'r mut R) -> Result<Self, UgoiraError> {
        // SAFETY: `reader` outlives `self` (the `'r` borrow), and the AVIO
        // context only dereferences it from inside demuxer calls made while
        // `self` is alive. Every allocation is either owned by the returned
        // value and released in `Drop`, or released right here on the error
        // paths before returning.
        unsafe {
            let buffer = av_malloc(STREAM_BUFFER_SIZE) as *mut u8;
            if buffer.is_null() {
                return Err(UgoiraError::OutOfMemory);
            }

            let mut avio = avio_alloc_context(
                buffer,
                STREAM_BUFFER_SIZE as c_int,
                0,
                reader as *mut R as *mut c_void,
                Some(read_packet::<R>),
                None,
                None,
            );
            if avio.is_null() {
                av_free(buffer as *mut c_void);
                return Err(UgoiraError::OutOfMemory);
            }

            let mut demuxer: *mut AVFormatContext = avformat_alloc_context();
            if demuxer.is_null() {
                free_avio(&mut avio);
                return Err(UgoiraError::OutOfMemory);
            }
            (*demuxer).pb = avio;

            let err = avformat_open_input(
                &mut demuxer,
                ptr::null(),
                ptr::null(),
                ptr::null_mut(),
            );
            if err < 0 {
                // On failure avformat_open_input frees the context but not
                // the custom pb.
                free_avio(&mut avio);
                return Err(ffmpeg_next::Error::from(err).into());
            }

            let mut source = Self {
                input: Some(Input::wrap(demuxer)),
                avio,
                _reader: PhantomData,
            };

            let err = avformat_find_stream_info(source.as_input_mut().as_mut_ptr(), ptr::null_mut());
            if err < 0 {
                return Err(ffmpeg_next::Error::from(err).into());
            }

            Ok(source)
        }
    }

    /// The probed demuxer context.
    pub(crate) fn as_input(&self) -> &Input {
        self.input.as_ref().expect("input taken before drop")
    }

    /// Mutable access to the demuxer context.
    pub(crate) fn as_input_mut(&mut self) -> &mut Input {
        self.input.as_mut().expect("input taken before drop")
    }
}

impl Drop for MediaSource<'_> {
    fn drop(&mut self) {
        // Close the demuxer before releasing the I/O it reads through.
        self.input.take();
        // SAFETY: the demuxer is gone, so nothing references the AVIO
        // context or its buffer any more.
        unsafe {
            free_avio(&mut self.avio);
        }
    }
}

/// Free an AVIO context and the scratch buffer it currently owns (FFmpeg
/// may have replaced the one originally allocated), then null the pointer.
unsafe fn free_avio(avio: &mut *mut AVIOContext) {
    if !avio.is_null() {
        av_freep(&mut (**avio).buffer as *mut _ as *mut c_void);
        avio_context_free(avio);
    }
}
