mod subscriber;
mod subscriber_email;
mod subscription_token;
// allow external `use` statements to skip `subscriber_email` etc
pub use subscriber::Subscriber;
pub use subscriber::TokenPolicy;
pub use subscriber_email::SubscriberEmail;
pub use subscription_token::SubscriptionToken;
