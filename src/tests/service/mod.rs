mod post_service_test;
