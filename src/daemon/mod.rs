mod app;
mod delegate;
mod view;

pub use app::run;
