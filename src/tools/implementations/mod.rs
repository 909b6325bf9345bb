// Tool implementations
//
// One command builder per supported external tool

// Image tools
pub mod eagleeye;
pub mod social_mapper;

// Domain tools
pub mod theharvester;

// Re-exports for convenience
pub use eagleeye::EagleEyeTool;
pub use social_mapper::SocialMapperTool;
pub use theharvester::TheHarvesterTool;
