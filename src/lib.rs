pub mod buffer;
pub mod codec;
pub mod error;
pub mod frames;
pub mod h264;
pub mod http;
pub mod stream;
pub mod timestamp;

pub use buffer::{BufferDescriptor, DecoderMemory, PhysAddr, VirtAddr};
pub use codec::{CodecId, DecoderFormat};
pub use error::{BitstreamError, Result};
pub use frames::{FrameQueue, OutputFrame, OutputSlots};
pub use h264::{AvcDecoderConfig, ConversionContext};
pub use stream::{StreamConfig, StreamFilter, StreamHints};
pub use timestamp::PtsTracker;
