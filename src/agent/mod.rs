pub mod fallback;
pub mod memory;
pub mod resolver;

pub use fallback::{
    ChatCompletionConfig, ChatCompletionResponder, FallbackResponder, PlaceholderResponder,
};
pub use memory::SessionMemory;
pub use resolver::{
    Resolution, ResolutionPath, ResolverBuilder, ResolverSettings, ResponseResolver,
};
