mod account_handlers_test;
