mod accounts;
mod funding;
mod sessions;
mod webhook;
