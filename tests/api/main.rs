// grouping all integration tests in a single binary; helpers is -not- an
// integration test, just a module shared by all of them
mod health_check;
mod reactivate;
mod store_failures;
mod unsubscribe;
