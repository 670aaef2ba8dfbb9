mod mock_engine;
mod protocol;
mod queues;
mod scenario;
mod tcp;
