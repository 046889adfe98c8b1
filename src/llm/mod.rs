pub mod intent;
pub mod oracle;
pub mod synthesis;
