mod event_handlers_test;
mod task_handlers_test;
