pub mod threaded_transition_renderer;
